use coil_ir::{BinaryOp, Name, Program, ProgramBuilder};
use pretty_assertions::assert_eq;

use super::*;

/// Builtin slot order used by these tests (mirrors the engine's table).
fn builtins(program: &Program) -> Vec<Name> {
    ["pair", "head", "tail", "is_pair", "abs"]
        .iter()
        .map(|s| program.interner.intern(s))
        .collect()
}

fn resolve(program: &Program) -> Result<ResolvedProgram, ResolveError> {
    resolve_program(&program.arena, program.body, &builtins(program))
}

#[test]
fn module_layout_collects_in_order() {
    let mut b = ProgramBuilder::new();
    let one = b.int(1);
    let s1 = b.assign("x", one);
    let two = b.int(2);
    let s2 = b.assign("y", two);
    let x = b.name("x");
    let s3 = b.assign("x", x);
    b.push(s1);
    b.push(s2);
    b.push(s3);
    let program = b.finish();

    let resolved = resolve(&program).expect("resolves");
    let module = resolved.frame(FrameId::MODULE);
    assert_eq!(module.names.len(), 2);
    assert_eq!(module.names[0], program.interner.intern("x"));
    assert_eq!(module.names[1], program.interner.intern("y"));
    assert!(!module.is_function);
}

#[test]
fn params_come_before_locals() {
    let mut b = ProgramBuilder::new();
    let one = b.int(1);
    let assign = b.assign("local", one);
    let n = b.name("n");
    let ret = b.ret(Some(n));
    let body = b.block(&[assign, ret]);
    let def = b.def("f", &["n", "m"], body);
    b.push(def);
    let program = b.finish();

    let resolved = resolve(&program).expect("resolves");
    let f_frame = resolved
        .frames()
        .iter()
        .find(|f| f.is_function)
        .expect("function frame");
    let names: Vec<&str> = f_frame
        .names
        .iter()
        .map(|&n| program.interner.lookup(n))
        .collect();
    assert_eq!(names, ["n", "m", "local"]);
}

#[test]
fn if_and_while_bodies_declare_at_function_level() {
    let mut b = ProgramBuilder::new();
    let cond = b.bool_lit(true);
    let one = b.int(1);
    let inner_assign = b.assign("inside", one);
    let then_body = b.block(&[inner_assign]);
    let if_stmt = b.if_stmt(cond, then_body, coil_ir::StmtRange::EMPTY);
    b.push(if_stmt);
    let program = b.finish();

    let resolved = resolve(&program).expect("resolves");
    let module = resolved.frame(FrameId::MODULE);
    assert_eq!(module.names, vec![program.interner.intern("inside")]);
}

#[test]
fn nested_function_bodies_do_not_leak_declarations() {
    let mut b = ProgramBuilder::new();
    let one = b.int(1);
    let inner = b.assign("inner_only", one);
    let body = b.block(&[inner]);
    let def = b.def("f", &[], body);
    b.push(def);
    let program = b.finish();

    let resolved = resolve(&program).expect("resolves");
    let module = resolved.frame(FrameId::MODULE);
    assert_eq!(module.names, vec![program.interner.intern("f")]);
}

#[test]
fn load_addresses_count_depth_outward() {
    let mut b = ProgramBuilder::new();
    let ten = b.int(10);
    let assign_g = b.assign("g", ten);
    // def f(n): return g
    let g_use = b.name("g");
    let ret = b.ret(Some(g_use));
    let body = b.block(&[ret]);
    let def = b.def("f", &["n"], body);
    b.push(assign_g);
    b.push(def);
    let program = b.finish();

    let resolved = resolve(&program).expect("resolves");
    // g is used from inside f: one frame outward, slot 0 of the module.
    assert_eq!(
        resolved.load_address(g_use),
        Some(LexicalAddress::new(1, 0))
    );
}

#[test]
fn builtin_resolves_past_module() {
    let mut b = ProgramBuilder::new();
    let callee = b.name("abs");
    let neg = b.int(-3);
    let call = b.call(callee, &[neg]);
    let stmt = b.expr_stmt(call);
    b.push(stmt);
    let program = b.finish();

    let resolved = resolve(&program).expect("resolves");
    // abs is slot 4 of the builtin frame, one frame out from the module.
    assert_eq!(
        resolved.load_address(callee),
        Some(LexicalAddress::new(1, 4))
    );
}

#[test]
fn undeclared_name_is_an_error() {
    let mut b = ProgramBuilder::new();
    let ghost = b.name("ghost");
    let stmt = b.expr_stmt(ghost);
    b.push(stmt);
    let program = b.finish();

    let err = resolve(&program).expect_err("must fail");
    assert_eq!(
        err.kind,
        ResolveErrorKind::Undeclared {
            name: program.interner.intern("ghost")
        }
    );
}

#[test]
fn local_shadow_resolves_to_local_slot() {
    // x exists at module level, and f assigns its own x: uses in f address
    // the local slot even before the assignment line (run-time unbound).
    let mut b = ProgramBuilder::new();
    let one = b.int(1);
    let module_x = b.assign("x", one);
    let x_use = b.name("x");
    let use_stmt = b.expr_stmt(x_use);
    let two = b.int(2);
    let local_assign = b.assign("x", two);
    let body = b.block(&[use_stmt, local_assign]);
    let def = b.def("f", &[], body);
    b.push(module_x);
    b.push(def);
    let program = b.finish();

    let resolved = resolve(&program).expect("resolves");
    assert_eq!(
        resolved.load_address(x_use),
        Some(LexicalAddress::new(0, 0))
    );
}

#[test]
fn nonlocal_removes_binding_and_resolves_outward() {
    // def outer():
    //     acc = 0
    //     def bump():
    //         nonlocal acc
    //         acc = acc + 1
    let mut b = ProgramBuilder::new();
    let zero = b.int(0);
    let init = b.assign("acc", zero);
    let decl = b.nonlocal(&["acc"]);
    let acc_use = b.name("acc");
    let one = b.int(1);
    let sum = b.binary(BinaryOp::Add, acc_use, one);
    let bump_assign = b.assign("acc", sum);
    let bump_body = b.block(&[decl, bump_assign]);
    let bump = b.def("bump", &[], bump_body);
    let outer_body = b.block(&[init, bump]);
    let outer = b.def("outer", &[], outer_body);
    b.push(outer);
    let program = b.finish();

    let resolved = resolve(&program).expect("resolves");
    let bump_frame = resolved
        .frames()
        .iter()
        .find(|f| {
            f.func
                .is_some_and(|func| program.arena.func(func).name == program.interner.intern("bump"))
        })
        .expect("bump frame");
    // acc was removed from bump's layout by the nonlocal declaration.
    assert!(bump_frame.names.is_empty());
    // Its use resolves one frame outward into outer's layout.
    assert_eq!(
        resolved.load_address(acc_use),
        Some(LexicalAddress::new(1, 0))
    );
}

#[test]
fn nonlocal_without_enclosing_binding_is_an_error() {
    let mut b = ProgramBuilder::new();
    let decl = b.nonlocal(&["missing"]);
    let body = b.block(&[decl]);
    let def = b.def("f", &[], body);
    b.push(def);
    let program = b.finish();

    let err = resolve(&program).expect_err("must fail");
    assert_eq!(
        err.kind,
        ResolveErrorKind::NonlocalMissing {
            name: program.interner.intern("missing")
        }
    );
}

#[test]
fn nonlocal_at_module_level_is_an_error() {
    let mut b = ProgramBuilder::new();
    let one = b.int(1);
    let assign = b.assign("x", one);
    let decl = b.nonlocal(&["x"]);
    b.push(assign);
    b.push(decl);
    let program = b.finish();

    let err = resolve(&program).expect_err("must fail");
    assert!(matches!(err.kind, ResolveErrorKind::NonlocalMissing { .. }));
}

#[test]
fn nonlocal_parameter_is_an_error() {
    // def outer(x):
    //     def inner(x):
    //         nonlocal x
    let mut b = ProgramBuilder::new();
    let decl = b.nonlocal(&["x"]);
    let inner_body = b.block(&[decl]);
    let inner = b.def("inner", &["x"], inner_body);
    let outer_body = b.block(&[inner]);
    let outer = b.def("outer", &["x"], outer_body);
    b.push(outer);
    let program = b.finish();

    let err = resolve(&program).expect_err("must fail");
    assert_eq!(
        err.kind,
        ResolveErrorKind::NonlocalParameter {
            name: program.interner.intern("x")
        }
    );
}

#[test]
fn use_before_nonlocal_declaration_is_an_error() {
    // def outer():
    //     acc = 0
    //     def bad():
    //         acc          <- before the nonlocal statement
    //         nonlocal acc
    let mut b = ProgramBuilder::new();
    let zero = b.int(0);
    let init = b.assign("acc", zero);
    let early_use = b.name("acc");
    let use_stmt = b.expr_stmt(early_use);
    let decl = b.nonlocal(&["acc"]);
    let bad_body = b.block(&[use_stmt, decl]);
    let bad = b.def("bad", &[], bad_body);
    let outer_body = b.block(&[init, bad]);
    let outer = b.def("outer", &[], outer_body);
    b.push(outer);
    let program = b.finish();

    let err = resolve(&program).expect_err("must fail");
    assert_eq!(
        err.kind,
        ResolveErrorKind::UsedBeforeNonlocal {
            name: program.interner.intern("acc")
        }
    );
}

#[test]
fn global_is_recorded_without_effect() {
    let mut b = ProgramBuilder::new();
    let one = b.int(1);
    let assign = b.assign("x", one);
    let decl = b.global(&["x"]);
    let x_use = b.name("x");
    let use_body = b.block(&[decl]);
    let def = b.def("f", &[], use_body);
    let use_stmt = b.expr_stmt(x_use);
    b.push(assign);
    b.push(def);
    b.push(use_stmt);
    let program = b.finish();

    let resolved = resolve(&program).expect("resolves");
    let f_frame = resolved
        .frames()
        .iter()
        .find(|f| f.is_function)
        .expect("function frame");
    assert_eq!(f_frame.globals, vec![program.interner.intern("x")]);
    // x still addresses the module slot from the module body.
    assert_eq!(
        resolved.load_address(x_use),
        Some(LexicalAddress::new(0, 0))
    );
}

#[test]
fn store_addresses_cover_assign_and_def() {
    let mut b = ProgramBuilder::new();
    let one = b.int(1);
    let assign = b.assign("x", one);
    let ret = b.ret(None);
    let body = b.block(&[ret]);
    let def = b.def("f", &[], body);
    b.push(assign);
    b.push(def);
    let program = b.finish();

    let resolved = resolve(&program).expect("resolves");
    assert_eq!(
        resolved.store_address(assign),
        Some(LexicalAddress::new(0, 0))
    );
    assert_eq!(
        resolved.store_address(def),
        Some(LexicalAddress::new(0, 1))
    );
}

#[test]
fn lambda_gets_params_only_frame() {
    let mut b = ProgramBuilder::new();
    let x_use = b.name("x");
    let lam = b.lambda(&["x"], x_use);
    let stmt = b.expr_stmt(lam);
    b.push(stmt);
    let program = b.finish();

    let resolved = resolve(&program).expect("resolves");
    let lam_frame = resolved
        .frames()
        .iter()
        .find(|f| f.is_function)
        .expect("lambda frame");
    assert_eq!(lam_frame.names, vec![program.interner.intern("x")]);
    assert_eq!(
        resolved.load_address(x_use),
        Some(LexicalAddress::new(0, 0))
    );
}
