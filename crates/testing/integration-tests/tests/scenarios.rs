//! End-to-end correlation of syntax, objects and IR

use anyhow::{Context, Result};
use expect_test::expect;
use integration_tests::{PackageFixture, Stage, init_tracing};
use rv_ast::NodeRef;
use rv_span::Pos;
use rv_ssa::{
    BuilderMode, EnclosingTopLevel, Value, ValueKind, WrapperTarget, classify_enclosing_top_level,
};
use rv_types::{BasicKind, MethodSetKey, SelectionKind};

fn complete() -> Result<PackageFixture> {
    init_tracing();
    PackageFixture::build(
        BuilderMode::GLOBAL_DEBUG | BuilderMode::SANITY_CHECK_FUNCTIONS,
        Stage::Complete,
    )
}

#[test]
fn test_var_initializer_belongs_to_package_init() -> Result<()> {
    let fx = complete()?;
    let chain = fx.chain_to(fx.nodes.x_init)?;
    assert_eq!(
        classify_enclosing_top_level(&fx.file, &chain),
        EnclosingTopLevel::PackageInit
    );
    assert_eq!(
        fx.program.enclosing_function(fx.pkg, &fx.file, &chain),
        Some(fx.functions.init)
    );
    Ok(())
}

#[test]
fn test_literal_is_innermost_enclosing_function() -> Result<()> {
    let fx = complete()?;
    let lit = fx.functions.lit.context("literal was built")?;
    let chain = fx.chain_to(fx.nodes.y_use)?;
    assert!(chain.nodes().contains(&NodeRef::Expr(fx.nodes.lit)));
    assert_eq!(
        fx.program.enclosing_function(fx.pkg, &fx.file, &chain),
        Some(lit)
    );
    assert_eq!(fx.program.function(lit).parent, Some(fx.functions.f));

    let value = fx
        .program
        .var_value(fx.objects.y, fx.pkg, &fx.file, &chain)?
        .context("y has a value inside the literal")?;
    let id = value.as_node().context("y is an instruction value")?;
    assert_eq!(fx.program.value(id).kind, ValueKind::Instr { parent: lit });
    assert_eq!(fx.program.value_type(&value), fx.basic(BasicKind::Int));
    Ok(())
}

#[test]
fn test_unbuilt_literal_is_not_found() -> Result<()> {
    init_tracing();
    let fx = PackageFixture::build(BuilderMode::GLOBAL_DEBUG, Stage::WithoutLiteral)?;
    let chain = fx.chain_to(fx.nodes.y_use)?;
    assert!(matches!(
        classify_enclosing_top_level(&fx.file, &chain),
        EnclosingTopLevel::Named {
            has_receiver: false,
            ..
        }
    ));
    assert_eq!(fx.program.enclosing_function(fx.pkg, &fx.file, &chain), None);
    assert_eq!(
        fx.program
            .var_value(fx.objects.y, fx.pkg, &fx.file, &chain)?,
        None
    );

    // the literal's parent still resolves
    let chain = fx.chain_to(fx.nodes.z_use)?;
    assert_eq!(
        fx.program.enclosing_function(fx.pkg, &fx.file, &chain),
        Some(fx.functions.f)
    );
    Ok(())
}

#[test]
fn test_method_body_resolves_to_declared_method() -> Result<()> {
    let fx = complete()?;
    let chain = fx.chain_to(fx.nodes.m_use_t)?;
    assert_eq!(
        classify_enclosing_top_level(&fx.file, &chain),
        EnclosingTopLevel::Named {
            name_pos: fx.pos(fx.nodes.m_name),
            has_receiver: true,
        }
    );
    assert_eq!(
        fx.program.enclosing_function(fx.pkg, &fx.file, &chain),
        Some(fx.functions.m)
    );

    // *T satisfies I, whose M resolves to a wrapper; the body never does
    let iface = fx
        .program
        .func_value(fx.objects.i_m)
        .context("interface method value")?;
    assert!(matches!(&iface, Value::Wrapper(wrapper) if wrapper.kind == WrapperTarget::Interface));

    let declared = fx.program.func_value(fx.objects.m).context("M value")?;
    let id = declared.as_node().context("declared methods are values")?;
    assert_eq!(fx.program.value_function(id), Some(fx.functions.m));

    // value receiver methods resolve the same way
    let chain = fx.chain_to(fx.nodes.v_name)?;
    assert_eq!(
        fx.program.enclosing_function(fx.pkg, &fx.file, &chain),
        Some(fx.functions.v)
    );
    Ok(())
}

#[test]
fn test_method_value_selection_matches_method_set() -> Result<()> {
    let fx = complete()?;
    let program = &fx.program;
    let model = program.model();
    let selection = fx
        .info
        .selections
        .get(&fx.nodes.m_sel)
        .context("t.V was resolved")?;
    assert_eq!(selection.kind, SelectionKind::MethodVal);
    assert_eq!(selection.obj, fx.objects.v);
    let recv = fx.info.object_of(fx.nodes.m_use_t).context("receiver use")?;
    assert_eq!(fx.info.object_of(fx.nodes.m_sel_t), Some(recv));

    let set = program.method_sets().method_set_of(model, selection.recv);
    let entry = set
        .lookup(model, Some(fx.pkg), model.object(selection.obj).name)
        .context("V is in the method set of *T")?;
    assert_eq!(entry.binding.func(), selection.obj);
    assert_eq!(entry.binding.is_wrapper(), selection.indirect);

    let value = program
        .method(MethodSetKey::of(model, selection.recv), &entry.binding)
        .context("wrapper for V")?;
    let Value::Wrapper(wrapper) = &value else {
        anyhow::bail!("expected a wrapper, got {value:?}");
    };
    assert_eq!(wrapper.kind, WrapperTarget::Indirection);
    assert_eq!(
        wrapper.target.and_then(|id| program.value_function(id)),
        Some(fx.functions.v)
    );
    Ok(())
}

#[test]
fn test_assignment_target_yields_address() -> Result<()> {
    let fx = complete()?;
    let int = fx.basic(BasicKind::Int);
    let int_ptr = fx
        .program
        .model()
        .lookup_pointer(int)
        .context("*int was created while building")?;

    let chain = fx.chain_to(fx.nodes.z_target)?;
    let target = fx
        .program
        .var_value(fx.objects.z, fx.pkg, &fx.file, &chain)?
        .context("assignment target has a value")?;
    assert_eq!(fx.program.value_type(&target), int_ptr);

    let chain = fx.chain_to(fx.nodes.z_use)?;
    let operand = fx
        .program
        .var_value(fx.objects.z, fx.pkg, &fx.file, &chain)?
        .context("operand has a value")?;
    assert_eq!(fx.program.value_type(&operand), int);
    assert!(!operand.same(&target));
    Ok(())
}

#[test]
fn test_parameter_definition_yields_parameter() -> Result<()> {
    let fx = complete()?;
    let chain = fx.chain_to(fx.nodes.a_name)?;
    let value = fx
        .program
        .var_value(fx.objects.a, fx.pkg, &fx.file, &chain)?
        .context("parameter value")?;
    let id = value.as_node().context("parameters are values")?;
    assert_eq!(
        fx.program.value(id).kind,
        ValueKind::Parameter {
            object: Some(fx.objects.a),
            parent: fx.functions.f
        }
    );
    Ok(())
}

#[test]
fn test_package_variable_yields_global() -> Result<()> {
    let fx = complete()?;
    // the reference is the declaring identifier; any chain in the file works
    let chain = fx.chain_to(fx.nodes.g_name)?;
    let value = fx
        .program
        .var_value(fx.objects.g, fx.pkg, &fx.file, &chain)?
        .context("global value")?;
    let id = value.as_node().context("globals are values")?;
    assert!(matches!(fx.program.value(id).kind, ValueKind::Global { .. }));
    let (elem, is_pointer) = fx.program.model().deref(fx.program.value_type(&value));
    assert!(is_pointer);
    assert_eq!(elem, fx.basic(BasicKind::Int));
    Ok(())
}

#[test]
fn test_var_value_needs_an_identifier() -> Result<()> {
    let fx = complete()?;
    let chain = fx.chain_to(fx.nodes.paren)?;
    assert!(
        fx.program
            .var_value(fx.objects.z, fx.pkg, &fx.file, &chain)
            .is_err()
    );
    Ok(())
}

#[test]
fn test_value_for_expr() -> Result<()> {
    let fx = complete()?;
    let f = fx.functions.f;
    let program = &fx.program;

    let paren = program
        .value_for_expr(f, &fx.file, fx.nodes.paren)
        .context("parenthesized value")?;
    let inner = program
        .value_for_expr(f, &fx.file, fx.nodes.z_paren)
        .context("inner value")?;
    assert!(paren.same(&inner));

    let cmp = program
        .value_for_expr(f, &fx.file, fx.nodes.cmp)
        .context("comparison value")?;
    assert_eq!(program.value_type(&cmp), fx.basic(BasicKind::Bool));

    // constants are recorded by the type checker, not the builder
    assert_eq!(program.value_for_expr(f, &fx.file, fx.nodes.one), None);
    assert!(fx.info.is_constant(fx.nodes.one));

    // expressions of other functions are not found
    assert_eq!(program.value_for_expr(f, &fx.file, fx.nodes.y_use), None);
    Ok(())
}

#[test]
fn test_no_debug_info_means_no_values() -> Result<()> {
    init_tracing();
    let fx = PackageFixture::build(BuilderMode::empty(), Stage::Complete)?;
    assert!(!fx.program.function(fx.functions.f).debug_info);
    assert_eq!(
        fx.program
            .value_for_expr(fx.functions.f, &fx.file, fx.nodes.sum),
        None
    );

    let chain = fx.chain_to(fx.nodes.z_use)?;
    assert_eq!(
        fx.program
            .var_value(fx.objects.z, fx.pkg, &fx.file, &chain)?,
        None
    );

    // parameters do not depend on debug references
    let chain = fx.chain_to(fx.nodes.a_name)?;
    assert!(
        fx.program
            .var_value(fx.objects.a, fx.pkg, &fx.file, &chain)?
            .is_some()
    );
    Ok(())
}

#[test]
fn test_declared_but_unbuilt_package() -> Result<()> {
    init_tracing();
    let fx = PackageFixture::build(BuilderMode::GLOBAL_DEBUG, Stage::Declared)?;
    let chain = fx.chain_to(fx.nodes.z_use)?;
    assert_eq!(
        fx.program.enclosing_function(fx.pkg, &fx.file, &chain),
        Some(fx.functions.f)
    );
    assert!(!fx.program.function(fx.functions.f).has_body());
    assert_eq!(
        fx.program
            .var_value(fx.objects.z, fx.pkg, &fx.file, &chain)?,
        None
    );

    // a package the program never created has no functions at all
    assert_eq!(fx.program.enclosing_function(fx.other, &fx.file, &chain), None);
    Ok(())
}

#[test]
fn test_func_values() -> Result<()> {
    let fx = complete()?;
    let program = &fx.program;
    let model = program.model();

    let len = model
        .universe()
        .lookup(model.interner().intern("len"))
        .context("len is predeclared")?;
    let value = program.func_value(len).context("builtin value")?;
    let id = value.as_node().context("builtins are values")?;
    assert_eq!(program.value(id).kind, ValueKind::Builtin { object: len });

    let error = program
        .func_value(model.universe().error_method)
        .context("error.Error value")?;
    let Value::Wrapper(wrapper) = &error else {
        anyhow::bail!("expected a wrapper, got {error:?}");
    };
    assert_eq!(wrapper.target, None);
    assert_eq!(wrapper.name, "(error).Error");

    let f = program.func_value(fx.objects.f).context("f value")?;
    assert_eq!(
        f.as_node().and_then(|id| program.value_function(id)),
        Some(fx.functions.f)
    );
    Ok(())
}

#[test]
fn test_const_values() -> Result<()> {
    let fx = complete()?;
    let program = &fx.program;
    let declared = program.const_value(fx.objects.k);
    assert!(declared.as_node().is_some());
    assert!(declared.same(&program.const_value(fx.objects.k)));

    let truth = program.const_value(program.model().universe().true_const);
    let Value::Const(constant) = &truth else {
        anyhow::bail!("expected a constant, got {truth:?}");
    };
    assert_eq!(constant.ty, fx.basic(BasicKind::UntypedBool));
    assert_eq!(constant.value.to_string(), "true");
    Ok(())
}

#[test]
fn test_package_initializer_text() -> Result<()> {
    let fx = complete()?;
    expect![[r#"
        # Name: init
        # Package: example.com/p
        # Synthetic: package initializer
        func init():
        0:
          *x = 1:int
          return
    "#]]
    .assert_eq(&fx.program.display_function(fx.functions.init).to_string());
    assert_eq!(fx.program.function(fx.functions.init).pos, Pos::NONE);
    Ok(())
}
