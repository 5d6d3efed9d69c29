mod common;

use pretty_assertions::assert_eq;

use common::*;
use unfold_core::ir::{BinaryOp, ElementInit, IrBuilder, MemberBinding, MethodKind, MethodRef, Type};
use unfold_core::{LowerConfig, Mode, Node, Translator};

// ---------------------------------------------------------------------------
// Reference shapes
// ---------------------------------------------------------------------------

#[test]
fn assigned_conditional_local_collapses_to_ternary() {
    let mut b = IrBuilder::new();
    let r = b.var("r", Type::int());
    let root = Node::block(
        vec![r.clone()],
        vec![
            Node::assign(Node::var(&r), Node::condition(Node::bool(true), Node::int(1), Node::int(2))),
            Node::var(&r),
        ],
    );
    assert_eq!(expr_text(&root), "true ? 1 : 2");
}

#[test]
fn void_conditional_becomes_if_else() {
    let mut b = IrBuilder::new();
    let test = b.var("test", Type::Bool);
    let root = Node::if_then_else(
        Node::var(&test),
        Node::block(vec![], vec![call_void("callA", vec![])]),
        Node::block(vec![], vec![call_void("callB", vec![])]),
    );
    let translation = translate(&root, Mode::Statement);
    assert_eq!(
        render(&translation.syntax),
        "if (test) { Program.callA(); } else { Program.callB(); }"
    );
    assert_eq!(translation.captured.into_iter().collect::<Vec<_>>(), vec![test]);
    assert_eq!(translation.namespaces.into_iter().collect::<Vec<_>>(), vec!["Demo".to_string()]);
}

// ---------------------------------------------------------------------------
// Evaluation order
// ---------------------------------------------------------------------------

#[test]
fn earlier_operand_is_hoisted_ahead_of_lifted_statements() {
    let lifting = Node::block(vec![], vec![call_void("log", vec![]), call_int("g")]);
    let root = Node::block(
        vec![],
        vec![call_void("sink", vec![Node::add(call_int("f"), lifting)])],
    );
    assert_eq!(
        stmt_text(&root),
        "{ var lifted = Program.f(); Program.log(); Program.sink(lifted + Program.g()); }"
    );
}

#[test]
fn literal_operands_are_not_hoisted() {
    let lifting = Node::block(vec![], vec![call_void("log", vec![]), call_int("g")]);
    let root = Node::block(vec![], vec![call_void("sink", vec![Node::int(1), lifting])]);
    assert_eq!(stmt_text(&root), "{ Program.log(); Program.sink(1, Program.g()); }");
}

#[test]
fn member_assignment_evaluates_object_before_value() {
    let boxed = Type::named("Demo", "Box");
    let target = Node::member(call("obj", vec![], boxed.clone()), boxed, "X", Type::int());
    let value = Node::block(vec![], vec![call_void("log", vec![]), Node::int(1)]);
    let root = Node::block(vec![], vec![Node::assign(target, value)]);
    assert_eq!(
        stmt_text(&root),
        "{ var lifted = Program.obj(); Program.log(); lifted.X = 1; }"
    );
}

#[test]
fn local_read_is_hoisted_when_a_later_operand_writes_it() {
    let mut b = IrBuilder::new();
    let x = b.var("x", Type::int());
    let rewrite = Node::block(vec![], vec![Node::assign(Node::var(&x), Node::int(5)), Node::int(1)]);
    let root = Node::block(
        vec![x.clone()],
        vec![
            Node::assign(Node::var(&x), call_int("Arg")),
            call_void("Use", vec![Node::var(&x), rewrite]),
        ],
    );
    assert_eq!(
        stmt_text(&root),
        "{ var x = Program.Arg(); var liftedArg = x; x = 5; Program.Use(liftedArg, 1); }"
    );
}

#[test]
fn every_argument_before_a_lifting_one_is_hoisted_in_order() {
    let lifting = Node::block(vec![], vec![call_void("log", vec![]), call_int("h")]);
    let root = Node::block(
        vec![],
        vec![call_void("sink", vec![call_int("f"), call_int("g"), lifting])],
    );
    assert_eq!(
        stmt_text(&root),
        "{ var liftedArg = Program.f(); var liftedArg0 = Program.g(); Program.log(); \
         Program.sink(liftedArg, liftedArg0, Program.h()); }"
    );
}

#[test]
fn receiver_is_hoisted_ahead_of_a_lifting_argument() {
    let boxed = Type::named("Demo", "Box");
    let receiver = call("obj", vec![], boxed.clone());
    let arg = Node::block(vec![], vec![call_void("log", vec![]), Node::int(1)]);
    let root = Node::block(
        vec![],
        vec![Node::call(receiver, MethodRef::new(boxed, "Run"), vec![arg], Type::Void)],
    );
    assert_eq!(
        stmt_text(&root),
        "{ var liftedArg = Program.obj(); Program.log(); liftedArg.Run(1); }"
    );
}

#[test]
fn compound_assignment_reads_the_target_before_lifted_writes() {
    let mut b = IrBuilder::new();
    let x = b.var("x", Type::int());
    let rewrite = Node::block(vec![], vec![Node::assign(Node::var(&x), Node::int(5)), Node::int(1)]);
    let root = Node::block(
        vec![x.clone()],
        vec![
            Node::assign(Node::var(&x), call_int("Arg")),
            Node::arith(BinaryOp::AddAssign, Node::var(&x), rewrite),
            call_void("Use", vec![Node::var(&x)]),
        ],
    );
    assert_eq!(
        stmt_text(&root),
        "{ var x = Program.Arg(); var lifted = x; x = 5; x = lifted + 1; Program.Use(x); }"
    );
}

#[test]
fn compound_assignment_without_lifting_keeps_the_operator() {
    let mut b = IrBuilder::new();
    let x = b.var("x", Type::int());
    let root = Node::arith(BinaryOp::AddAssign, Node::var(&x), Node::int(2));
    assert_eq!(expr_text(&root), "x += 2");
}

#[test]
fn short_circuit_right_operand_stays_behind_the_test() {
    let mut b = IrBuilder::new();
    let c = b.var("c", Type::Bool);
    let d = b.var("d", Type::Bool);
    let right = Node::block(vec![], vec![call_void("log", vec![]), Node::var(&d)]);
    let root = Node::block(
        vec![],
        vec![call_void("sink", vec![Node::and_also(Node::var(&c), right)])],
    );
    assert_eq!(
        stmt_text(&root),
        "{ bool liftedConditional; \
         if (c) { Program.log(); liftedConditional = d; } else { liftedConditional = false; } \
         Program.sink(liftedConditional); }"
    );
}

#[test]
fn short_circuit_without_lifting_stays_an_operator() {
    let mut b = IrBuilder::new();
    let c = b.var("c", Type::Bool);
    let root = Node::and_also(Node::var(&c), call("ok", vec![], Type::Bool));
    assert_eq!(expr_text(&root), "c && Program.ok()");
}

// ---------------------------------------------------------------------------
// Temporaries and naming
// ---------------------------------------------------------------------------

#[test]
fn conditional_assigns_enclosing_target_directly() {
    let mut b = IrBuilder::new();
    let c = b.var("c", Type::Bool);
    let y = b.var("y", Type::int());
    let arm = Node::block(vec![], vec![call_void("log", vec![]), Node::int(1)]);
    let root = Node::block(
        vec![],
        vec![Node::assign(Node::var(&y), Node::condition(Node::var(&c), arm, Node::int(2)))],
    );
    assert_eq!(
        stmt_text(&root),
        "{ if (c) { Program.log(); y = 1; } else { y = 2; } }"
    );
}

#[test]
fn local_assigned_through_lifting_conditional_is_declared_up_front() {
    let mut b = IrBuilder::new();
    let c = b.var("c", Type::Bool);
    let x = b.var("x", Type::int());
    let arm = Node::block(vec![], vec![call_void("log", vec![]), Node::int(1)]);
    let root = Node::block(
        vec![x.clone()],
        vec![
            Node::assign(Node::var(&x), Node::condition(Node::var(&c), arm, Node::int(2))),
            call_void("sink", vec![Node::var(&x)]),
        ],
    );
    assert_eq!(
        stmt_text(&root),
        "{ int x; if (c) { Program.log(); x = 1; } else { x = 2; } Program.sink(x); }"
    );
}

#[test]
fn nested_blocks_get_distinct_names() {
    let mut b = IrBuilder::new();
    let outer = b.var("x", Type::int());
    let inner = b.var("x", Type::int());
    let root = Node::block(
        vec![outer.clone()],
        vec![
            Node::assign(Node::var(&outer), Node::int(1)),
            Node::block(
                vec![inner.clone()],
                vec![
                    Node::assign(Node::var(&inner), Node::int(2)),
                    call_void("sink", vec![Node::var(&inner)]),
                ],
            ),
            call_void("sink", vec![Node::var(&outer)]),
        ],
    );
    assert_eq!(
        stmt_text(&root),
        "{ var x = 1; { var x0 = 2; Program.sink(x0); } Program.sink(x); }"
    );
}

#[test]
fn sibling_blocks_reuse_names_the_enclosing_block_avoids() {
    let mut b = IrBuilder::new();
    let first = b.var("x", Type::int());
    let second = b.var("x", Type::int());
    let outer = b.var("x", Type::int());
    let nested = |v: &unfold_core::ir::Variable| {
        Node::block(
            vec![v.clone()],
            vec![
                Node::assign(Node::var(v), Node::int(1)),
                call_void("sink", vec![Node::var(v)]),
            ],
        )
    };
    let root = Node::block(
        vec![outer.clone()],
        vec![
            nested(&first),
            nested(&second),
            Node::assign(Node::var(&outer), Node::int(3)),
            call_void("sink", vec![Node::var(&outer)]),
        ],
    );
    assert_eq!(
        stmt_text(&root),
        "{ { var x0 = 1; Program.sink(x0); } { var x0 = 1; Program.sink(x0); } \
         var x = 3; Program.sink(x); }"
    );
}

#[test]
fn unnamed_locals_share_the_anonymous_counter() {
    let mut b = IrBuilder::new();
    let first = b.unnamed_var(Type::int());
    let second = b.unnamed_var(Type::int());
    let root = Node::block(
        vec![first.clone(), second.clone()],
        vec![
            Node::assign(Node::var(&first), Node::int(1)),
            Node::assign(Node::var(&second), Node::int(2)),
            call_void("sink", vec![Node::var(&first), Node::var(&second)]),
        ],
    );
    assert_eq!(
        stmt_text(&root),
        "{ var unnamed = 1; var unnamed0 = 2; Program.sink(unnamed, unnamed0); }"
    );
}

#[test]
fn null_initializer_keeps_an_explicit_type() {
    let mut b = IrBuilder::new();
    let s = b.var("s", Type::String);
    let root = Node::block(
        vec![s.clone()],
        vec![
            Node::assign(Node::var(&s), Node::null(Type::String)),
            call_void("sink", vec![Node::var(&s)]),
        ],
    );
    assert_eq!(stmt_text(&root), "{ string s = null; Program.sink(s); }");

    let config = LowerConfig::from_skip_list(&["merge-local-initializers"]);
    let out = translate_with(config, &root, Mode::Statement);
    assert_eq!(render(&out.syntax), "{ string s; s = null; Program.sink(s); }");
}

#[test]
fn pure_statements_are_dropped_or_discarded() {
    let mut b = IrBuilder::new();
    let x = b.var("x", Type::int());
    let root = Node::block(vec![], vec![Node::var(&x), call_void("a", vec![])]);
    assert_eq!(stmt_text(&root), "{ Program.a(); }");

    let config = LowerConfig::from_skip_list(&["elide-pure-statements"]);
    let out = translate_with(config, &root, Mode::Statement);
    assert_eq!(render(&out.syntax), "{ _ = x; Program.a(); }");
}

// ---------------------------------------------------------------------------
// Capture and determinism
// ---------------------------------------------------------------------------

#[test]
fn outer_variable_is_captured_once_by_name() {
    let mut b = IrBuilder::new();
    let a = b.var("a", Type::int());
    let outer = b.var("outer", Type::int());
    let body = Node::add(Node::add(Node::var(&a), Node::var(&outer)), Node::var(&outer));
    let root = Node::lambda(vec![a], body, Type::named("System", "Func"));
    let translation = translate(&root, Mode::Expression);
    assert_eq!(render(&translation.syntax), "(int a) => (a + outer) + outer");
    let captured: Vec<_> = translation.captured.iter().map(|v| v.name.clone()).collect();
    assert_eq!(captured, vec![Some("outer".to_string())]);
}

#[test]
fn generated_names_avoid_captured_names() {
    let mut b = IrBuilder::new();
    let taken = b.var("lifted", Type::int());
    let lifting = Node::block(vec![], vec![call_void("log", vec![]), call_int("g")]);
    let root = Node::block(
        vec![],
        vec![call_void(
            "sink",
            vec![Node::add(Node::var(&taken), Node::int(0)), Node::add(call_int("f"), lifting)],
        )],
    );
    assert_eq!(
        stmt_text(&root),
        "{ var liftedArg = lifted + 0; var lifted0 = Program.f(); Program.log(); \
         Program.sink(liftedArg, lifted0 + Program.g()); }"
    );
}

#[test]
fn same_root_translates_identically() {
    let mut b = IrBuilder::new();
    let c = b.var("c", Type::Bool);
    let x = b.unnamed_var(Type::int());
    let arm = Node::block(vec![], vec![call_void("log", vec![]), Node::int(1)]);
    let root = Node::block(
        vec![x.clone()],
        vec![
            Node::assign(Node::var(&x), Node::condition(Node::var(&c), arm, Node::int(2))),
            call_void("sink", vec![Node::add(call_int("f"), Node::var(&x))]),
        ],
    );
    let mut translator = Translator::default();
    let first = translator.translate_statement(&root).unwrap();
    let second = translator.translate_statement(&root).unwrap();
    assert_eq!(first.syntax, second.syntax);
    assert_eq!(first.captured, second.captured);
}

// ---------------------------------------------------------------------------
// Lambdas and closures
// ---------------------------------------------------------------------------

#[test]
fn lambda_with_lifting_body_gets_a_block() {
    let mut b = IrBuilder::new();
    let a = b.var("a", Type::int());
    let body = Node::block(
        vec![],
        vec![call_void("log", vec![Node::var(&a)]), Node::add(Node::var(&a), Node::int(1))],
    );
    let root = Node::lambda(vec![a], body, Type::named("System", "Func"));
    assert_eq!(expr_text(&root), "(int a) => { Program.log(a); return a + 1; }");
}

#[test]
fn lambda_conditional_returns_from_each_branch() {
    let mut b = IrBuilder::new();
    let a = b.var("a", Type::int());
    let test = Node::binary(BinaryOp::GreaterThan, Node::var(&a), Node::int(0), Type::Bool);
    let arm = Node::block(vec![], vec![call_void("log", vec![]), Node::int(1)]);
    let root = Node::lambda(
        vec![a],
        Node::condition(test, arm, Node::int(2)),
        Type::named("System", "Func"),
    );
    assert_eq!(
        expr_text(&root),
        "(int a) => { if (a > 0) { Program.log(); return 1; } else { return 2; } }"
    );
}

#[test]
fn lambda_parameters_are_named_and_typed() {
    let mut b = IrBuilder::new();
    let first = b.unnamed_var(Type::int());
    let second = b.unnamed_var(Type::String);
    let anon = b.var("row", Type::Anonymous("<>f__AnonymousType0".into()));
    let root = Node::lambda(
        vec![first.clone(), second, anon],
        call_void("sink", vec![Node::var(&first)]),
        Type::named("System", "Action"),
    );
    assert_eq!(
        expr_text(&root),
        "(int unnamed1, string unnamed2, row) => Program.sink(unnamed1)"
    );

    let config = LowerConfig::from_skip_list(&["explicit-lambda-parameter-types"]);
    let out = translate_with(config, &root, Mode::Expression);
    assert_eq!(render(&out.syntax), "(unnamed1, unnamed2, row) => Program.sink(unnamed1)");
}

#[test]
fn invoked_lambda_is_inlined() {
    let mut b = IrBuilder::new();
    let p = b.var("p", Type::int());
    let closure = Node::lambda(
        vec![p.clone()],
        call_void("sink", vec![Node::var(&p)]),
        Type::named("System", "Action"),
    );
    let root = Node::block(vec![], vec![Node::invoke(closure.clone(), vec![Node::int(5)], Type::Void)]);
    assert_eq!(stmt_text(&root), "{ Program.sink(5); }");

    let config = LowerConfig::from_skip_list(&["inline-closure-invocations"]);
    let out = translate_with(config, &root, Mode::Statement);
    assert_eq!(render(&out.syntax), "{ ((int p) => Program.sink(p))(5); }");
}

#[test]
fn inlined_argument_is_evaluated_once() {
    let mut b = IrBuilder::new();
    let p = b.var("p", Type::int());
    let closure = Node::lambda(
        vec![p.clone()],
        call_void("sink", vec![Node::add(Node::var(&p), Node::var(&p))]),
        Type::named("System", "Action"),
    );
    let root = Node::block(vec![], vec![Node::invoke(closure, vec![call_int("f")], Type::Void)]);
    assert_eq!(stmt_text(&root), "{ var p = Program.f(); Program.sink(p + p); }");
}

#[test]
fn inlined_parameter_assigned_by_the_body_is_hoisted() {
    let mut b = IrBuilder::new();
    let p = b.var("p", Type::int());
    let rewrite = Node::block(vec![], vec![Node::assign(Node::var(&p), Node::int(5)), Node::var(&p)]);
    let closure = Node::lambda(
        vec![p.clone()],
        call_void("Use", vec![Node::add(Node::var(&p), rewrite)]),
        Type::named("System", "Action"),
    );
    let root = Node::block(vec![], vec![Node::invoke(closure, vec![call_int("Arg")], Type::Void)]);
    assert_eq!(
        stmt_text(&root),
        "{ var p = Program.Arg(); var lifted = p; p = 5; Program.Use(lifted + p); }"
    );
}

// ---------------------------------------------------------------------------
// Per-kind rendering
// ---------------------------------------------------------------------------

#[test]
fn extension_and_static_calls() {
    let mut b = IrBuilder::new();
    let xs = b.var("xs", Type::generic("System.Collections.Generic", "List", vec![Type::int()]));
    let take = MethodRef::new(Type::named("System.Linq", "Enumerable"), "Take").with_kind(MethodKind::Extension);
    let root = Node::call_static(take, vec![Node::var(&xs), Node::int(1)], Type::Object);
    let translation = translate(&root, Mode::Expression);
    assert_eq!(render(&translation.syntax), "xs.Take(1)");
    assert!(translation.namespaces.contains("System.Linq"));
}

#[test]
fn power_of_doubles_uses_math_pow() {
    let mut b = IrBuilder::new();
    let x = b.var("x", Type::double());
    let y = b.var("y", Type::double());
    let root = Node::arith(BinaryOp::Power, Node::var(&x), Node::var(&y));
    let translation = translate(&root, Mode::Expression);
    assert_eq!(render(&translation.syntax), "Math.Pow(x, y)");
    assert!(translation.namespaces.contains("System"));
}

#[test]
fn generic_creation_collects_nested_namespaces() {
    let list = Type::generic(
        "System.Collections.Generic",
        "List",
        vec![Type::named("Demo.Model", "Item")],
    );
    let translation = translate(&Node::new_object(list, vec![]), Mode::Expression);
    assert_eq!(render(&translation.syntax), "new List<Item>()");
    assert_eq!(
        translation.namespaces.into_iter().collect::<Vec<_>>(),
        vec!["Demo.Model".to_string(), "System.Collections.Generic".to_string()]
    );
}

#[test]
fn enum_flags_and_casts() {
    use unfold_core::ir::Constant;
    let color = Type::named("Demo", "Color");
    let flags = Node::constant(
        Constant::Enum {
            ty: color.clone(),
            members: vec!["Red".into(), "Blue".into()],
        },
        color.clone(),
    );
    assert_eq!(expr_text(&flags), "Color.Red | Color.Blue");
    let undefined = Node::constant(Constant::EnumValue { ty: color.clone(), value: 9 }, color);
    assert_eq!(expr_text(&undefined), "(Color)9");
}

#[test]
fn anonymous_objects_and_arrays() {
    let anon = Node::new_anonymous(
        Type::Anonymous("<>f__AnonymousType0".into()),
        vec!["A".into(), "B".into()],
        vec![Node::int(1), Node::string("b")],
    );
    assert_eq!(expr_text(&anon), "new { A = 1, B = \"b\" }");
    let array = Node::new_array(Type::int(), vec![Node::int(1), Node::int(2)]);
    assert_eq!(expr_text(&array), "new int[] { 1, 2 }");
    let sized = Node::new_array_bounds(Type::String, Node::int(3));
    assert_eq!(expr_text(&sized), "new string[3]");
}

#[test]
fn object_and_collection_initializers() {
    let boxed = Type::named("Demo", "Box");
    let list = Type::generic("System.Collections.Generic", "List", vec![Type::int()]);

    let object = Node::member_init(
        Node::new_object(boxed.clone(), vec![Node::int(2)]),
        vec![
            MemberBinding::assign("X", Node::int(1)),
            MemberBinding::Member {
                member: "Inner".into(),
                bindings: vec![MemberBinding::assign("A", Node::string("a"))],
            },
            MemberBinding::List {
                member: "Items".into(),
                enumerable: true,
                initializers: vec![ElementInit::add(list.clone(), Node::int(3))],
            },
        ],
    );
    assert_eq!(
        expr_text(&object),
        "new Box(2) { X = 1, Inner = { A = \"a\" }, Items = { 3 } }"
    );

    let items = Node::list_init(
        Node::new_object(list.clone(), vec![]),
        vec![ElementInit::add(list.clone(), Node::int(1)), ElementInit::add(list, call_int("f"))],
    );
    let translation = translate(&items, Mode::Expression);
    assert_eq!(render(&translation.syntax), "new List<int> { 1, Program.f() }");
    assert!(translation.namespaces.contains("System.Collections.Generic"));
}

#[test]
fn non_public_fields_go_through_reflection() {
    let mut b = IrBuilder::new();
    let boxed = Type::named("Demo", "Box");
    let target = b.var("b", boxed.clone());
    let field = Node::non_public_field(Node::var(&target), boxed, "secret", Type::int());
    let get_field = "typeof(Box).GetField(\"secret\", \
                     BindingFlags.Instance | (BindingFlags.NonPublic | BindingFlags.DeclaredOnly))";

    let translation = translate(&field, Mode::Expression);
    assert_eq!(render(&translation.syntax), format!("(int){get_field}.GetValue(b)"));
    assert!(translation.namespaces.contains("System.Reflection"));

    let write = Node::assign(field.clone(), Node::int(3));
    assert_eq!(expr_text(&write), format!("{get_field}.SetValue(b, 3)"));

    let bump = Node::arith(BinaryOp::AddAssign, field, Node::int(1));
    assert_eq!(
        expr_text(&bump),
        format!("{get_field}.SetValue(b, ((int){get_field}.GetValue(b)) + 1)")
    );
}
