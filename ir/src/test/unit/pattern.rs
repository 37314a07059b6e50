use test_case::test_case;

use qlower_dtype::DType;

use crate::test::helpers::quantized_module_chain;
use crate::{Arg, Graph, Literal, ModuleTree, Pattern, is_match, match_pattern};

fn module_pattern(ty: &'static str) -> Pattern {
    Pattern::function("quantize_per_tensor").with_operands([
        Pattern::module(ty).with_operands([Pattern::method("dequantize")]).named("ref"),
        Pattern::any().named("scale"),
        Pattern::any().named("zero_point"),
        Pattern::any().named("dtype"),
    ])
}

#[test]
fn test_module_pattern_binds_operands() {
    let c = quantized_module_chain();
    let bindings = match_pattern(&c.gm.modules, &c.gm.graph, c.q, &module_pattern("Linear")).unwrap();

    assert_eq!(bindings.node("ref"), Some(c.call));
    assert_eq!(bindings.node("scale"), Some(c.scale));
    assert_eq!(bindings.node("zero_point"), Some(c.zero_point));
    assert_eq!(bindings.get("dtype"), Some(&Arg::Lit(Literal::DType(DType::QUInt8))));
    assert_eq!(bindings.node("dtype"), None);
}

#[test_case("Linear", true; "matching module type")]
#[test_case("Conv2d", false; "other module type")]
fn test_module_head_compares_resolved_type(ty: &'static str, expected: bool) {
    let c = quantized_module_chain();
    assert_eq!(is_match(&c.gm.modules, &c.gm.graph, c.q, &module_pattern(ty)), expected);
}

#[test]
fn test_module_head_needs_registry_entry() {
    let c = quantized_module_chain();
    assert!(!is_match(&ModuleTree::default(), &c.gm.graph, c.q, &module_pattern("Linear")));
}

#[test]
fn test_arity_must_match_exactly() {
    let c = quantized_module_chain();
    let short = Pattern::function("quantize_per_tensor")
        .with_operands([Pattern::any(), Pattern::any(), Pattern::any()]);
    let exact = Pattern::function("quantize_per_tensor")
        .with_operands([Pattern::any(), Pattern::any(), Pattern::any(), Pattern::any()]);

    assert!(!is_match(&c.gm.modules, &c.gm.graph, c.q, &short));
    assert!(is_match(&c.gm.modules, &c.gm.graph, c.q, &exact));
}

#[test]
fn test_head_only_pattern_ignores_operands() {
    let c = quantized_module_chain();
    assert!(is_match(&c.gm.modules, &c.gm.graph, c.dq, &Pattern::method("dequantize")));
    assert!(!is_match(&c.gm.modules, &c.gm.graph, c.dq, &Pattern::function("dequantize")));
    assert!(is_match(&c.gm.modules, &c.gm.graph, c.scale, &Pattern::get_attr()));
}

#[test_case(Pattern::literal(DType::QUInt8), true; "equal literal")]
#[test_case(Pattern::literal(DType::Float16), false; "different literal")]
#[test_case(Pattern::any(), true; "wildcard accepts literal")]
#[test_case(Pattern::get_attr(), false; "node pattern rejects literal")]
fn test_literal_operand(dtype: Pattern, expected: bool) {
    let c = quantized_module_chain();
    let pattern = Pattern::function("quantize_per_tensor")
        .with_operands([Pattern::any(), Pattern::get_attr(), Pattern::get_attr(), dtype]);
    assert_eq!(is_match(&c.gm.modules, &c.gm.graph, c.q, &pattern), expected);
}

#[test]
fn test_nested_operand_with_two_users_does_not_match() {
    let mut g = Graph::new();
    let x = g.placeholder("x").unwrap();
    let dq = g.call_method("dequantize", [x.into()]).unwrap();
    let relu = g.call_function("relu", [dq.into()]).unwrap();
    let size = g.call_method("size", [dq.into()]).unwrap();
    let out = g.call_function("add", [relu.into(), size.into()]).unwrap();
    g.output(out).unwrap();
    let modules = ModuleTree::default();

    let pattern = Pattern::function("relu").with_operands([Pattern::method("dequantize")]);
    assert!(!is_match(&modules, &g, relu, &pattern));

    // The root itself may have any number of users.
    assert!(is_match(&modules, &g, dq, &Pattern::method("dequantize").with_operands([Pattern::any()])));
}

#[test]
fn test_each_matches_every_list_element() {
    let mut g = Graph::new();
    let a = g.placeholder("a").unwrap();
    let b = g.placeholder("b").unwrap();
    let dqa = g.call_method("dequantize", [a.into()]).unwrap();
    let dqb = g.call_method("dequantize", [b.into()]).unwrap();
    let cat = g.call_function("cat", [Arg::from(vec![dqa, dqb])]).unwrap();
    let mixed = g.call_function("cat", [Arg::from(vec![a, b])]).unwrap();
    let out = g.call_function("add", [cat.into(), mixed.into()]).unwrap();
    g.output(out).unwrap();
    let modules = ModuleTree::default();

    let pattern = Pattern::function("cat").with_operands([Pattern::each(Pattern::method("dequantize"))]);
    assert!(is_match(&modules, &g, cat, &pattern));
    assert!(!is_match(&modules, &g, mixed, &pattern));
}

#[test]
fn test_pattern_display() {
    assert_eq!(module_pattern("Linear").to_string(), "quantize_per_tensor(Linear(.dequantize), _, _, _)");
}
