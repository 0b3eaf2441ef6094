use kestrel_resolve::{FilePhase, Instantiation, Report, ResolutionError, ResolverConfig, Ty};
use kestrel_syntax::{Access, FileId, ModuleId};

use crate::common::Workspace;

const DUPLICATE: &str = "kestrel_resolve::duplicate_definition";
const LINKAGE: &str = "kestrel_resolve::linkage_collision";
const NOT_FOUND: &str = "kestrel_resolve::name_not_found";

#[test]
fn test_cross_file_forward_reference() {
    let mut ws = Workspace::new();
    let (caller, call) = {
        let mut b = ws.builder(2, 0);
        let call = b.call("foo", vec![], vec![]);
        let body = b.block(vec![call]);
        let main = b.function("main", Access::Private, vec![], vec![], None, Some(body));
        b.item(main);
        (b.finish(), call)
    };
    let (callee, foo) = {
        let mut b = ws.builder(1, 0);
        let foo = b.function("foo", Access::Public, vec![], vec![], None, None);
        b.item(foo);
        (b.finish(), foo)
    };

    let module = ws.resolver.module_scope_start(ModuleId(0), &[]);
    ws.resolve(&[&caller, &callee]);
    ws.resolver.module_scope_end(module);

    assert!(ws.diagnostics.is_empty(), "{}", ws.summaries());
    assert_eq!(ws.resolver.reference(call), Some(foo));
    assert_eq!(ws.resolver.phase(FileId(1)), FilePhase::BodyLinked);
    assert_eq!(ws.resolver.phase(FileId(2)), FilePhase::BodyLinked);
}

#[test]
fn test_overloads_with_distinct_parameters_coexist() {
    let mut ws = Workspace::new();
    let (file, by_int, by_string) = {
        let mut b = ws.builder(1, 0);
        let int = b.ty("int", vec![]);
        let x = b.param("x", int);
        let by_int = b.function("show", Access::Public, vec![], vec![x], None, None);
        let string = b.ty("string", vec![]);
        let y = b.param("y", string);
        let by_string = b.function("show", Access::Public, vec![], vec![y], None, None);
        b.item(by_int).item(by_string);
        (b.finish(), by_int, by_string)
    };

    let _module = ws.resolver.module_scope_start(ModuleId(0), &[]);
    ws.resolve(&[&file]);

    assert!(ws.diagnostics.is_empty(), "{}", ws.summaries());
    let show = ws.name("show");
    assert_eq!(ws.resolver.find_overloads(ws.ast(), show), vec![by_string, by_int]);
    assert_eq!(ws.resolver.find(show), Some(by_string));
}

#[test]
fn test_identical_signatures_are_duplicates() {
    let mut ws = Workspace::new();
    let (file, second) = {
        let mut b = ws.builder(1, 0);
        let int = b.ty("int", vec![]);
        let x = b.param("x", int);
        let first = b.function("twice", Access::Internal, vec![], vec![x], None, None);
        let int = b.ty("int", vec![]);
        let renamed = b.param("renamed", int);
        let second = b.function("twice", Access::Internal, vec![], vec![renamed], None, None);
        b.item(first).item(second);
        (b.finish(), second)
    };

    let _module = ws.resolver.module_scope_start(ModuleId(0), &[]);
    ws.resolve(&[&file]);

    assert_eq!(ws.count(DUPLICATE), 1, "{}", ws.summaries());
    assert_eq!(ws.count(LINKAGE), 0);
    assert_eq!(ws.find("twice"), Some(second));
    assert_eq!(ws.diagnostics[0].node, Some(second));
}

#[test]
fn test_function_then_variable_is_duplicate() {
    let mut ws = Workspace::new();
    let (file, variable) = {
        let mut b = ws.builder(1, 0);
        let function = b.function("value", Access::Internal, vec![], vec![], None, None);
        let variable = b.variable("value", Access::Internal, None, None);
        b.item(function).item(variable);
        (b.finish(), variable)
    };

    let _module = ws.resolver.module_scope_start(ModuleId(0), &[]);
    ws.resolve(&[&file]);

    assert_eq!(ws.codes(), vec![DUPLICATE]);
    assert_eq!(ws.find("value"), Some(variable));
}

#[test]
fn test_duplicates_across_files_of_a_module() {
    let mut ws = Workspace::new();
    let first = {
        let mut b = ws.builder(1, 0);
        let item = b.structure("Point", Access::Internal, vec![], vec![]);
        b.item(item);
        b.finish()
    };
    let second = {
        let mut b = ws.builder(2, 0);
        let item = b.structure("Point", Access::Public, vec![], vec![]);
        b.item(item);
        b.finish()
    };

    let _module = ws.resolver.module_scope_start(ModuleId(0), &[]);
    ws.resolve(&[&first, &second]);

    assert_eq!(ws.codes(), vec![DUPLICATE]);
}

#[test]
fn test_linkage_collision_despite_lexical_overload() {
    let mut ws = Workspace::new();
    let file = {
        let mut b = ws.builder(1, 0);
        let t = b.generic("T");
        let list = b.structure("List", Access::Public, vec![t], vec![]);
        let int = b.ty("int", vec![]);
        let of_int = b.ty("List", vec![int]);
        let a = b.param("a", of_int);
        let first = b.function("sum", Access::Public, vec![], vec![a], None, None);
        let string = b.ty("string", vec![]);
        let of_string = b.ty("List", vec![string]);
        let a = b.param("a", of_string);
        let second = b.function("sum", Access::Public, vec![], vec![a], None, None);
        b.item(list).item(first).item(second);
        b.finish()
    };

    let _module = ws.resolver.module_scope_start(ModuleId(0), &[]);
    ws.resolve(&[&file]);

    assert_eq!(ws.count(DUPLICATE), 0, "{}", ws.summaries());
    assert_eq!(ws.count(LINKAGE), 1);
    match &ws.diagnostics[0].report {
        Report::Error(ResolutionError::LinkageNameCollision { linkage_name, .. }) => {
            assert_eq!(linkage_name, "sum(List)");
        }
        other => panic!("unexpected report {other:?}"),
    }
}

#[test]
fn test_linkage_names_follow_access() {
    let mut ws = Workspace::new();
    let (file, public, internal, private) = {
        let mut b = ws.builder(4, 2);
        let public = b.function("open", Access::Public, vec![], vec![], None, None);
        let int = b.ty("int", vec![]);
        let x = b.param("x", int);
        let internal = b.function("step", Access::Internal, vec![], vec![x], None, None);
        let private = b.variable("counter", Access::Private, None, None);
        b.item(public).item(internal).item(private);
        (b.finish(), public, internal, private)
    };

    let _module = ws.resolver.module_scope_start(ModuleId(2), &[]);
    ws.resolve(&[&file]);

    assert!(ws.diagnostics.is_empty(), "{}", ws.summaries());
    assert_eq!(ws.resolver.linkage_owner("open()"), Some(public));
    assert_eq!(ws.resolver.linkage_owner("module#2::step(int)"), Some(internal));
    assert_eq!(ws.resolver.linkage_owner("module#2::file#4::counter"), Some(private));
}

#[test]
fn test_public_linkage_names_are_global() {
    let mut ws = Workspace::new();
    let first = {
        let mut b = ws.builder(1, 0);
        let public = b.function("run", Access::Public, vec![], vec![], None, None);
        let internal = b.function("helper", Access::Internal, vec![], vec![], None, None);
        b.item(public).item(internal);
        b.finish()
    };
    let second = {
        let mut b = ws.builder(2, 1);
        let public = b.function("run", Access::Public, vec![], vec![], None, None);
        let internal = b.function("helper", Access::Internal, vec![], vec![], None, None);
        b.item(public).item(internal);
        b.finish()
    };

    let module = ws.resolver.module_scope_start(ModuleId(0), &[]);
    ws.resolve(&[&first]);
    ws.resolver.module_scope_end(module);
    let module = ws.resolver.module_scope_start(ModuleId(1), &[]);
    ws.resolve(&[&second]);
    ws.resolver.module_scope_end(module);

    assert_eq!(ws.codes(), vec![LINKAGE]);
}

#[test]
fn test_private_declarations_stay_in_their_file() {
    let mut ws = Workspace::new();
    let (owner, inside) = {
        let mut b = ws.builder(1, 0);
        let secret = b.function("secret", Access::Private, vec![], vec![], None, None);
        let inside = b.call("secret", vec![], vec![]);
        let body = b.block(vec![inside]);
        let user = b.function("user", Access::Internal, vec![], vec![], None, Some(body));
        let helper = b.function("helper", Access::Private, vec![], vec![], None, None);
        b.item(secret).item(user).item(helper);
        (b.finish(), inside)
    };
    let (stranger, outside) = {
        let mut b = ws.builder(2, 0);
        let outside = b.call("secret", vec![], vec![]);
        let body = b.block(vec![outside]);
        let other = b.function("other", Access::Private, vec![], vec![], None, Some(body));
        let helper = b.function("helper", Access::Private, vec![], vec![], None, None);
        b.item(other).item(helper);
        (b.finish(), outside)
    };

    let _module = ws.resolver.module_scope_start(ModuleId(0), &[]);
    ws.resolve(&[&owner, &stranger]);

    assert!(ws.resolver.reference(inside).is_some());
    assert_eq!(ws.resolver.reference(outside), None);
    assert_eq!(ws.codes(), vec![NOT_FOUND]);
    match &ws.diagnostics[0].report {
        Report::Error(ResolutionError::NameNotFound { name, help, .. }) => {
            assert_eq!(name, "secret");
            assert_eq!(help.as_deref(), Some("`secret` is private to file#1"));
        }
        other => panic!("unexpected report {other:?}"),
    }
    assert_eq!(ws.find("secret"), None);
}

#[test]
fn test_file_regions_without_entries_keep_enclosing_scopes_open() {
    let mut ws = Workspace::new();
    let lonely = {
        let mut b = ws.builder(1, 0);
        let f = b.function("f", Access::Private, vec![], vec![], None, None);
        b.item(f);
        b.finish()
    };
    let next = {
        let mut b = ws.builder(2, 0);
        let g = b.function("g", Access::Internal, vec![], vec![], None, None);
        b.item(g);
        b.finish()
    };

    let module = ws.resolver.module_scope_start(ModuleId(0), &[]);
    ws.tld(&lonely);
    assert_eq!(ws.resolver.table().scope_depth(), 3);
    ws.link(&lonely);
    assert_eq!(ws.resolver.table().scope_depth(), 3);

    ws.resolve(&[&next]);
    assert_eq!(ws.resolver.table().scope_depth(), 4);
    assert!(ws.find("g").is_some());

    assert_eq!(ws.resolver.invalidate_file(FileId(1)), vec![FileId(1), FileId(2)]);
    assert_eq!(ws.resolver.table().scope_depth(), 2);
    ws.resolve(&[&lonely, &next]);
    assert_eq!(ws.resolver.table().scope_depth(), 4);

    ws.resolver.module_scope_end(module);
    assert_eq!(ws.resolver.table().scope_depth(), 1);
    assert!(ws.diagnostics.is_empty(), "{}", ws.summaries());
}

#[test]
fn test_calls_pick_the_overload_by_arity() {
    let mut ws = Workspace::new();
    let (file, binary, good, bad) = {
        let mut b = ws.builder(1, 0);
        let int = b.ty("int", vec![]);
        let a = b.param("a", int);
        let unary = b.function("add", Access::Public, vec![], vec![a], None, None);
        let int = b.ty("int", vec![]);
        let a = b.param("a", int);
        let int = b.ty("int", vec![]);
        let c = b.param("c", int);
        let binary = b.function("add", Access::Public, vec![], vec![a, c], None, None);
        let one = b.literal();
        let two = b.literal();
        let good = b.call("add", vec![], vec![one, two]);
        let bad = b.call("add", vec![], vec![]);
        let body = b.block(vec![good, bad]);
        let main = b.function("main", Access::Private, vec![], vec![], None, Some(body));
        b.item(unary).item(binary).item(main);
        (b.finish(), binary, good, bad)
    };

    let _module = ws.resolver.module_scope_start(ModuleId(0), &[]);
    ws.resolve(&[&file]);

    assert_eq!(ws.resolver.reference(good), Some(binary));
    assert_eq!(ws.resolver.reference(bad), None);
    assert_eq!(ws.diagnostics.len(), 1);
    assert_eq!(ws.diagnostics[0].node, Some(bad));
    match &ws.diagnostics[0].report {
        Report::Error(ResolutionError::NoMatchingOverload { found, candidates, .. }) => {
            assert_eq!((*found, *candidates), (0, 2));
        }
        other => panic!("unexpected report {other:?}"),
    }
}

#[test]
fn test_locals_shadow_and_restore() {
    let config = ResolverConfig { warn_on_shadowing: true, ..Default::default() };
    let mut ws = Workspace::with_config(config);
    let (file, param, inner_let, inner_use, outer_use, copy_init, first_a) = {
        let mut b = ws.builder(1, 0);
        let int = b.ty("int", vec![]);
        let param = b.param("x", int);

        let literal = b.literal();
        let first_a = b.variable("a", Access::Private, None, Some(literal));
        let copy_init = b.ident("a");
        let second_a = b.variable("a", Access::Private, None, Some(copy_init));

        let init = b.ident("x");
        let inner_let = b.variable("x", Access::Private, None, Some(init));
        let inner_use = b.ident("x");
        let inner = b.block(vec![inner_let, inner_use]);
        let outer_use = b.ident("x");

        let body = b.block(vec![first_a, second_a, inner, outer_use]);
        let main = b.function("main", Access::Private, vec![], vec![param], None, Some(body));
        b.item(main);
        (b.finish(), param, inner_let, inner_use, outer_use, copy_init, first_a)
    };

    let _module = ws.resolver.module_scope_start(ModuleId(0), &[]);
    ws.resolve(&[&file]);

    assert_eq!(ws.resolver.reference(copy_init), Some(first_a));
    assert_eq!(ws.resolver.reference(inner_use), Some(inner_let));
    assert_eq!(ws.resolver.reference(outer_use), Some(param));
    assert_eq!(
        ws.codes(),
        vec!["kestrel_resolve::shadowed_variable", "kestrel_resolve::shadowed_variable"]
    );
    assert!(ws.diagnostics.iter().all(|diagnostic| !diagnostic.is_error()));
    assert_eq!(ws.find("x"), None);
}

#[test]
fn test_type_positions_require_types() {
    let mut ws = Workspace::new();
    let (file, takes_function) = {
        let mut b = ws.builder(1, 0);
        let helper = b.function("helper", Access::Internal, vec![], vec![], None, None);
        let helper_ty = b.ty("helper", vec![]);
        let p = b.param("p", helper_ty);
        let takes_function = b.function("g", Access::Internal, vec![], vec![p], None, None);
        let a = b.generic("A");
        let c = b.generic("B");
        let pair = b.structure("Pair", Access::Internal, vec![a, c], vec![]);
        let int = b.ty("int", vec![]);
        let half = b.ty("Pair", vec![int]);
        let p = b.param("p", half);
        let takes_half = b.function("h", Access::Internal, vec![], vec![p], None, None);
        b.item(helper).item(takes_function).item(pair).item(takes_half);
        (b.finish(), takes_function)
    };

    let _module = ws.resolver.module_scope_start(ModuleId(0), &[]);
    ws.resolve(&[&file]);

    assert_eq!(
        ws.codes(),
        vec!["kestrel_resolve::not_a_type", "kestrel_resolve::generic_arity_mismatch"]
    );
    let signature = ws.resolver.signature(takes_function).unwrap();
    assert_eq!(signature.params, vec![Ty::Error]);
    assert_eq!(signature.ret, None);
}

#[test]
fn test_signatures_bind_types_and_instantiate_structs() {
    let mut ws = Workspace::new();
    let (file, boxed, open) = {
        let mut b = ws.builder(1, 0);
        let t = b.generic("T");
        let t_ty = b.ty("T", vec![]);
        let value = b.param("value", t_ty);
        let boxed = b.structure("Box", Access::Public, vec![t], vec![value]);

        let u = b.generic("U");
        let u_ty = b.ty("U", vec![]);
        let v = b.param("v", u_ty);
        let u_ty = b.ty("U", vec![]);
        let of_u = b.ty("Box", vec![u_ty]);
        let wrap = b.function("wrap", Access::Public, vec![u], vec![v], Some(of_u), None);

        let int = b.ty("int", vec![]);
        let of_int = b.ty("Box", vec![int]);
        let p = b.param("b", of_int);
        let int = b.ty("int", vec![]);
        let open = b.function("open", Access::Public, vec![], vec![p], Some(int), None);

        let int = b.ty("int", vec![]);
        let of_int = b.ty("Box", vec![int]);
        let global = b.variable("origin", Access::Internal, Some(of_int), None);
        b.item(boxed).item(wrap).item(open).item(global);
        (b.finish(), boxed, open)
    };

    let _module = ws.resolver.module_scope_start(ModuleId(0), &[]);
    ws.resolve(&[&file]);
    assert!(ws.diagnostics.is_empty(), "{}", ws.summaries());

    let int = ws.find("int").unwrap();
    let box_of_int = Ty::Named { decl: boxed, args: vec![Ty::named(int)] };
    let signature = ws.resolver.signature(open).unwrap();
    assert_eq!(signature.params, vec![box_of_int.clone()]);
    assert_eq!(signature.ret, Some(Ty::named(int)));
    assert_eq!(box_of_int.display(&ws.arena, &ws.interner), "Box<int>");

    assert_eq!(ws.instantiator.calls, vec![(boxed, vec![Ty::named(int)])]);
    let instantiations = ws.resolver.instantiations();
    assert_eq!(instantiations.instantiation_types_for(boxed), &[vec![Ty::named(int)]]);
}

#[test]
fn test_generic_calls_are_instantiated_once_per_argument_list() {
    let mut ws = Workspace::new();
    let (file, make, calls, wrong) = {
        let mut b = ws.builder(1, 0);
        let t = b.generic("T");
        let make = b.function("make", Access::Public, vec![t], vec![], None, None);
        let mut calls = Vec::new();
        for ty in ["int", "int", "bool"] {
            let arg = b.ty(ty, vec![]);
            calls.push(b.call("make", vec![arg], vec![]));
        }
        let int = b.ty("int", vec![]);
        let bool_ty = b.ty("bool", vec![]);
        let wrong = b.call("make", vec![int, bool_ty], vec![]);
        let mut stmts = calls.clone();
        stmts.push(wrong);
        let body = b.block(stmts);
        let main = b.function("main", Access::Private, vec![], vec![], None, Some(body));
        b.item(make).item(main);
        (b.finish(), make, calls, wrong)
    };

    let _module = ws.resolver.module_scope_start(ModuleId(0), &[]);
    ws.resolve(&[&file]);

    let (int, bool_ty) = (ws.find("int").unwrap(), ws.find("bool").unwrap());
    assert_eq!(
        ws.resolver.instantiation_of(calls[0]),
        Some(&Instantiation { generic: make, args: vec![Ty::named(int)] })
    );
    assert_eq!(ws.resolver.instantiation_of(calls[0]), ws.resolver.instantiation_of(calls[1]));
    assert_eq!(
        ws.resolver.instantiation_of(calls[2]).map(|inst| inst.args.clone()),
        Some(vec![Ty::named(bool_ty)])
    );
    assert_eq!(ws.instantiator.calls.len(), 2);
    assert_eq!(ws.resolver.instantiations().instantiation_count(make), 2);

    assert_eq!(ws.codes(), vec!["kestrel_resolve::generic_arity_mismatch"]);
    assert_eq!(ws.resolver.instantiation_of(wrong), None);
    assert_eq!(ws.resolver.reference(wrong), Some(make));
}

#[test]
fn test_dependent_modules_see_exports_only() {
    let mut ws = Workspace::new();
    let (library, greet) = {
        let mut b = ws.builder(1, 0);
        let greet = b.function("greet", Access::Public, vec![], vec![], None, None);
        let hidden = b.function("hidden", Access::Internal, vec![], vec![], None, None);
        b.item(greet).item(hidden);
        (b.finish(), greet)
    };
    let (app, to_greet, local_int) = {
        let mut b = ws.builder(2, 1);
        let to_greet = b.call("greet", vec![], vec![]);
        let to_hidden = b.call("hidden", vec![], vec![]);
        let body = b.block(vec![to_greet, to_hidden]);
        let main = b.function("main", Access::Private, vec![], vec![], None, Some(body));
        let local_int = b.structure("int", Access::Internal, vec![], vec![]);
        b.item(main).item(local_int);
        (b.finish(), to_greet, local_int)
    };

    let module = ws.resolver.module_scope_start(ModuleId(0), &[]);
    ws.resolve(&[&library]);
    ws.resolver.module_scope_end(module);
    assert_eq!(ws.resolver.exports(ModuleId(0)).len(), 1);
    assert_eq!(ws.find("greet"), None);

    let _module = ws.resolver.module_scope_start(ModuleId(1), &[ModuleId(0)]);
    ws.resolve(&[&app]);

    assert_eq!(ws.resolver.reference(to_greet), Some(greet));
    assert_eq!(ws.codes(), vec![NOT_FOUND]);
    assert_eq!(ws.find("int"), Some(local_int));
}

#[test]
fn test_reopening_a_module_starts_over() {
    let mut ws = Workspace::new();
    let file = {
        let mut b = ws.builder(1, 0);
        let run = b.function("run", Access::Public, vec![], vec![], None, None);
        b.item(run);
        b.finish()
    };

    let module = ws.resolver.module_scope_start(ModuleId(0), &[]);
    ws.resolve(&[&file]);
    ws.resolver.module_scope_end(module);
    assert_eq!(ws.resolver.phase(FileId(1)), FilePhase::BodyLinked);

    let module = ws.resolver.module_scope_start(ModuleId(0), &[]);
    assert_eq!(ws.resolver.phase(FileId(1)), FilePhase::NotDeclared);
    ws.resolve(&[&file]);
    ws.resolver.module_scope_end(module);

    assert!(ws.diagnostics.is_empty(), "{}", ws.summaries());
}

#[test]
fn test_clear_keeps_builtins_only() {
    let mut ws = Workspace::new();
    let file = {
        let mut b = ws.builder(1, 0);
        let run = b.function("run", Access::Public, vec![], vec![], None, None);
        b.item(run);
        b.finish()
    };
    let _module = ws.resolver.module_scope_start(ModuleId(0), &[]);
    ws.resolve(&[&file]);

    ws.resolver.clear();

    assert_eq!(ws.find("run"), None);
    assert!(ws.find("bool").is_some());
    assert_eq!(ws.resolver.current_module(), None);
    assert_eq!(ws.resolver.phase(FileId(1)), FilePhase::NotDeclared);
    assert_eq!(ws.resolver.table().len(), ws.resolver.builtins().count());
}

#[test]
#[should_panic(expected = "never declared")]
fn test_linking_before_declaring_panics() {
    let mut ws = Workspace::new();
    let file = ws.builder(1, 0).finish();
    let _module = ws.resolver.module_scope_start(ModuleId(0), &[]);
    ws.link(&file);
}

#[test]
#[should_panic(expected = "is body linked")]
fn test_linking_bodies_twice_panics() {
    let mut ws = Workspace::new();
    let file = ws.builder(1, 0).finish();
    let _module = ws.resolver.module_scope_start(ModuleId(0), &[]);
    ws.resolve(&[&file]);
    ws.link(&file);
}

#[test]
#[should_panic(expected = "still open")]
fn test_one_module_at_a_time() {
    let mut ws = Workspace::new();
    let _first = ws.resolver.module_scope_start(ModuleId(0), &[]);
    let _second = ws.resolver.module_scope_start(ModuleId(1), &[]);
}
