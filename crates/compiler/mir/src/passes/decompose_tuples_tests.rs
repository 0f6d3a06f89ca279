//! Unit tests for the tuple decomposition pass

use proptest::prelude::*;

use crate::conversion::{ConversionConfig, ConversionError, OneToNTypeConverter, RewriteBuilder};
use crate::passes::{DecomposeTuplesPass, MirPass, TupleFlattener};
use crate::testing::TestFunctionBuilder;
use crate::{
    InstructionKind, Literal, MirFunction, MirModule, MirType, Terminator, TupleLiteral, Value,
};
use tern_compiler_diagnostics::DiagnosticCode;

fn nested_pair_ty() -> MirType {
    // (i32, (i32, i32))
    MirType::tuple(vec![
        MirType::i32(),
        MirType::tuple(vec![MirType::i32(), MirType::i32()]),
    ])
}

fn run(function: &mut MirFunction) -> bool {
    DecomposeTuplesPass::new().run(function)
}

fn run_with(function: &mut MirFunction, config: ConversionConfig) -> bool {
    DecomposeTuplesPass::with_config(config).run(function)
}

fn tuple_op_count(function: &MirFunction) -> usize {
    function
        .basic_blocks
        .iter()
        .flat_map(|block| block.instructions.iter())
        .filter(|instruction| instruction.is_tuple_op())
        .count()
}

fn count_kind(function: &MirFunction, matches: fn(&InstructionKind) -> bool) -> usize {
    function
        .basic_blocks
        .iter()
        .flat_map(|block| block.instructions.iter())
        .filter(|instruction| matches(&instruction.kind))
        .count()
}

fn return_values(function: &MirFunction) -> Vec<Value> {
    for block in function.basic_blocks.iter() {
        if let Terminator::Return { values } = &block.terminator {
            return values.clone();
        }
    }
    panic!("function has no return terminator");
}

#[test]
fn test_extract_element_forwards_leaves() {
    let mut b = TestFunctionBuilder::new("extract_element");
    let c10 = b.const_i32(10);
    let c20 = b.const_i32(20);
    let c30 = b.const_i32(30);
    let inner = b.make_tuple(vec![c20, c30]);
    let t = b.make_tuple(vec![c10, inner]);
    let e = b.extract(t, 1);
    b.ret(vec![e]);
    let mut function = b.build();

    assert!(run(&mut function));

    assert_eq!(tuple_op_count(&function), 0);
    assert_eq!(
        return_values(&function),
        vec![Value::operand(c20), Value::operand(c30)]
    );
    assert_eq!(function.return_types, vec![MirType::i32(), MirType::i32()]);
}

#[test]
fn test_extract_leaf_element() {
    let mut b = TestFunctionBuilder::new("extract_leaf");
    let c10 = b.const_i32(10);
    let c20 = b.const_i32(20);
    let c30 = b.const_i32(30);
    let inner = b.make_tuple(vec![c20, c30]);
    let t = b.make_tuple(vec![c10, inner]);
    let e = b.extract(t, 0);
    b.ret(vec![e]);
    let mut function = b.build();

    assert!(run(&mut function));
    assert_eq!(return_values(&function), vec![Value::operand(c10)]);
}

#[test]
fn test_extract_slice_order_and_duplication() {
    // extract_slice [1, 0] on flat values [10, 20, 30] yields [20, 30, 10]:
    // the range for position 1, then the range for position 0, concatenated
    // in list order and never deduplicated.
    let mut b = TestFunctionBuilder::new("extract_slice");
    let c10 = b.const_i32(10);
    let c20 = b.const_i32(20);
    let c30 = b.const_i32(30);
    let inner = b.make_tuple(vec![c20, c30]);
    let t = b.make_tuple(vec![c10, inner]);
    let s = b.extract_slice(t, vec![1, 0]);
    b.ret(vec![s]);
    let mut function = b.build();

    assert!(run(&mut function));
    assert_eq!(
        return_values(&function),
        vec![
            Value::operand(c20),
            Value::operand(c30),
            Value::operand(c10)
        ]
    );

    // A repeated position contributes its leaves again.
    let mut b = TestFunctionBuilder::new("extract_slice_repeated");
    let c10 = b.const_i32(10);
    let c20 = b.const_i32(20);
    let c30 = b.const_i32(30);
    let inner = b.make_tuple(vec![c20, c30]);
    let t = b.make_tuple(vec![c10, inner]);
    let s = b.extract_slice(t, vec![1, 1]);
    b.ret(vec![s]);
    let mut function = b.build();

    assert!(run(&mut function));
    assert_eq!(
        return_values(&function),
        vec![
            Value::operand(c20),
            Value::operand(c30),
            Value::operand(c20),
            Value::operand(c30)
        ]
    );
}

#[test]
fn test_const_tuple_expands_to_scalar_constants() {
    // const_tuple (7, (8, 9)) becomes three scalar constants producing
    // 7, 8, 9 in that order.
    let mut b = TestFunctionBuilder::new("const_tuple");
    let t = b.const_tuple(TupleLiteral::tuple(vec![
        TupleLiteral::int(7, MirType::i32()),
        TupleLiteral::tuple(vec![
            TupleLiteral::int(8, MirType::i32()),
            TupleLiteral::int(9, MirType::i32()),
        ]),
    ]));
    b.ret(vec![t]);
    let mut function = b.build();

    assert!(run(&mut function));
    assert_eq!(tuple_op_count(&function), 0);

    let mut const_dests = Vec::new();
    let mut const_ints = Vec::new();
    for block in function.basic_blocks.iter() {
        for instruction in &block.instructions {
            if let InstructionKind::Const {
                dest,
                value: Literal::Int(value),
                ..
            } = &instruction.kind
            {
                const_dests.push(Value::operand(*dest));
                const_ints.push(*value);
            }
        }
    }
    assert_eq!(const_ints, vec![7, 8, 9]);
    assert_eq!(return_values(&function), const_dests);
}

#[test]
fn test_insert_extract_law() {
    // extract(insert(t, i, x), i) == x and extract(insert(t, i, x), j) is
    // untouched for j != i.
    let mut b = TestFunctionBuilder::new("insert_element");
    let c10 = b.const_i32(10);
    let c20 = b.const_i32(20);
    let c30 = b.const_i32(30);
    let inner = b.make_tuple(vec![c20, c30]);
    let t = b.make_tuple(vec![c10, inner]);
    let c100 = b.const_i32(100);
    let c200 = b.const_i32(200);
    let x = b.make_tuple(vec![c100, c200]);
    let updated = b.insert(t, 1, x);
    let e1 = b.extract(updated, 1);
    let e0 = b.extract(updated, 0);
    b.ret(vec![e1, e0]);
    let mut function = b.build();

    assert!(run(&mut function));
    assert_eq!(
        return_values(&function),
        vec![
            Value::operand(c100),
            Value::operand(c200),
            Value::operand(c10)
        ]
    );
}

#[test]
fn test_insert_slice() {
    // insert_slice positions [1] with slice ((100, 200),) on flat values
    // [10, 20, 30] yields [10, 100, 200].
    let mut b = TestFunctionBuilder::new("insert_slice");
    let c10 = b.const_i32(10);
    let c20 = b.const_i32(20);
    let c30 = b.const_i32(30);
    let inner = b.make_tuple(vec![c20, c30]);
    let t = b.make_tuple(vec![c10, inner]);
    let c100 = b.const_i32(100);
    let c200 = b.const_i32(200);
    let replacement = b.make_tuple(vec![c100, c200]);
    let slice = b.make_tuple(vec![replacement]);
    let updated = b.insert_slice(t, vec![1], slice);
    b.ret(vec![updated]);
    let mut function = b.build();

    assert!(run(&mut function));
    assert_eq!(
        return_values(&function),
        vec![
            Value::operand(c10),
            Value::operand(c100),
            Value::operand(c200)
        ]
    );
}

#[test]
fn test_insert_slice_skips_empty_positions() {
    // A slice covering an empty-tuple position leaves its (zero) leaves
    // untouched and converts without error.
    let mut b = TestFunctionBuilder::new("insert_slice_empty");
    let c1 = b.const_i32(1);
    let empty = b.make_empty_tuple();
    let t = b.make_tuple(vec![c1, empty]);
    let c2 = b.const_i32(2);
    let empty2 = b.make_empty_tuple();
    let slice = b.make_tuple(vec![c2, empty2]);
    let updated = b.insert_slice(t, vec![0, 1], slice);
    b.ret(vec![updated]);
    let mut function = b.build();

    assert!(run(&mut function));
    assert_eq!(return_values(&function), vec![Value::operand(c2)]);
    assert_eq!(function.return_types, vec![MirType::i32()]);
}

#[test]
fn test_concat_forwards_both_sides() {
    let mut b = TestFunctionBuilder::new("concat");
    let c1 = b.const_i32(1);
    let c2 = b.const_i32(2);
    let c3 = b.const_i32(3);
    let lhs = b.make_tuple(vec![c1, c2]);
    let rhs = b.make_tuple(vec![c3]);
    let joined = b.concat(lhs, rhs);
    let e = b.extract(joined, 2);
    b.ret(vec![e]);
    let mut function = b.build();

    assert!(run(&mut function));
    assert_eq!(return_values(&function), vec![Value::operand(c3)]);
}

#[test]
fn test_to_elements_round_trip() {
    // Destructuring a freshly constructed tuple forwards the original leaf
    // values: to_elements(make_tuple(xs)) == xs.
    let mut b = TestFunctionBuilder::new("round_trip");
    let c10 = b.const_i32(10);
    let c20 = b.const_i32(20);
    let c30 = b.const_i32(30);
    let inner = b.make_tuple(vec![c20, c30]);
    let t = b.make_tuple(vec![c10, inner]);
    let elements = b.to_elements(t);
    b.ret(elements);
    let mut function = b.build();

    assert!(run(&mut function));
    assert_eq!(tuple_op_count(&function), 0);
    assert_eq!(
        return_values(&function),
        vec![
            Value::operand(c10),
            Value::operand(c20),
            Value::operand(c30)
        ]
    );
}

#[test]
fn test_out_of_bounds_position_aborts_conversion() {
    let mut b = TestFunctionBuilder::new("out_of_bounds");
    let c1 = b.const_i32(1);
    let c2 = b.const_i32(2);
    let t = b.make_tuple(vec![c1, c2]);
    let e = b.extract(t, 5);
    b.ret(vec![e]);

    let mut module = MirModule::new();
    module.add_function(b.build());
    let before = module.clone();

    let err = DecomposeTuplesPass::new()
        .run_on_module(&mut module)
        .unwrap_err();
    assert_eq!(
        err,
        ConversionError::PositionOutOfBounds {
            position: 5,
            arity: 2
        }
    );
    assert_eq!(
        err.to_diagnostic().code,
        DiagnosticCode::PositionOutOfBounds
    );

    // Nothing was committed.
    assert_eq!(module, before);

    // Through the MirPass interface the failure leaves the function alone.
    let mut function = before.functions[crate::FunctionId::new(0)].clone();
    let unchanged = function.clone();
    assert!(!DecomposeTuplesPass::new().run(&mut function));
    assert_eq!(function, unchanged);
}

#[test]
fn test_underivable_literal_type_is_rejected() {
    let mut b = TestFunctionBuilder::new("bad_literal");
    let t = b.const_tuple_with_type(
        TupleLiteral::tuple(vec![
            TupleLiteral::int(1, MirType::i32()),
            TupleLiteral::int(2, MirType::unknown()),
        ]),
        MirType::tuple(vec![MirType::i32(), MirType::i32()]),
    );
    b.ret(vec![t]);

    let mut module = MirModule::new();
    module.add_function(b.build());

    let err = DecomposeTuplesPass::new()
        .run_on_module(&mut module)
        .unwrap_err();
    assert!(matches!(err, ConversionError::TypeMismatch { .. }));
}

#[test]
fn test_const_tuple_self_type_mismatch_is_rejected() {
    let mut b = TestFunctionBuilder::new("bad_self_type");
    let t = b.const_tuple_with_type(
        TupleLiteral::tuple(vec![TupleLiteral::int(7, MirType::i32())]),
        MirType::tuple(vec![MirType::i64()]),
    );
    b.ret(vec![t]);

    let mut module = MirModule::new();
    module.add_function(b.build());

    let err = DecomposeTuplesPass::new()
        .run_on_module(&mut module)
        .unwrap_err();
    assert!(matches!(err, ConversionError::TypeMismatch { .. }));
}

#[test]
fn test_insert_slice_arity_mismatch_is_rejected() {
    // A malformed slice/position-list pairing is reported, not assumed away.
    let mut b = TestFunctionBuilder::new("bad_slice");
    let c1 = b.const_i32(1);
    let c2 = b.const_i32(2);
    let t = b.make_tuple(vec![c1, c2]);
    let c3 = b.const_i32(3);
    let slice = b.make_tuple(vec![c3]);
    let updated = b.insert_slice(t, vec![0, 1], slice);
    b.ret(vec![updated]);

    let mut module = MirModule::new();
    module.add_function(b.build());

    let err = DecomposeTuplesPass::new()
        .run_on_module(&mut module)
        .unwrap_err();
    assert!(matches!(err, ConversionError::TypeMismatch { .. }));
}

#[test]
fn test_unconverted_parameter_is_decomposed_at_use() {
    // With signature conversion off, a tuple-typed parameter stays
    // structured and its converted uses go through to_elements.
    let config = ConversionConfig {
        convert_signatures: false,
        convert_block_params: true,
    };

    let mut b = TestFunctionBuilder::new("param_bridge");
    let param = b.parameter(nested_pair_ty());
    let e = b.extract(param, 1);
    b.ret(vec![e]);
    let mut function = b.build();
    function.return_types = vec![MirType::tuple(vec![MirType::i32(), MirType::i32()])];

    assert!(run_with(&mut function, config));

    // The parameter list is untouched.
    assert_eq!(function.parameters, vec![param]);
    assert_eq!(
        function.return_types,
        vec![MirType::tuple(vec![MirType::i32(), MirType::i32()])]
    );

    // Two nesting levels are taken apart, and the structured return value is
    // rebuilt from the extracted leaves.
    assert_eq!(
        count_kind(&function, |k| matches!(
            k,
            InstructionKind::TupleToElements { .. }
        )),
        2
    );
    assert_eq!(
        count_kind(&function, |k| matches!(k, InstructionKind::MakeTuple { .. })),
        1
    );

    let entry = function.entry_block;
    let last = function.basic_blocks[entry]
        .instructions
        .last()
        .expect("expected instructions");
    let InstructionKind::MakeTuple { dest, .. } = &last.kind else {
        panic!("expected trailing make_tuple, found {:?}", last.kind);
    };
    assert_eq!(return_values(&function), vec![Value::operand(*dest)]);
}

#[test]
fn test_unconverted_call_boundary_is_reconstructed() {
    // With signature conversion off, a converted tuple passed to a call is
    // rebuilt with make_tuple right before the call.
    let config = ConversionConfig {
        convert_signatures: false,
        convert_block_params: true,
    };

    let mut b = TestFunctionBuilder::new("call_bridge");
    let c1 = b.const_i32(1);
    let c2 = b.const_i32(2);
    let t = b.make_tuple(vec![c1, c2]);
    let results = b.call(crate::FunctionId::new(7), vec![t], vec![MirType::i32()]);
    b.ret(results);
    let mut function = b.build();

    assert!(run_with(&mut function, config));

    let entry = function.entry_block;
    let instructions = &function.basic_blocks[entry].instructions;
    let make_tuple_dest = instructions
        .iter()
        .find_map(|instruction| match &instruction.kind {
            InstructionKind::MakeTuple { dest, elements } => {
                assert_eq!(
                    elements,
                    &vec![Value::operand(c1), Value::operand(c2)]
                );
                Some(*dest)
            }
            _ => None,
        })
        .expect("expected a reconstructed tuple");

    let call = instructions
        .iter()
        .find(|instruction| matches!(instruction.kind, InstructionKind::Call { .. }))
        .expect("expected the call to survive");
    let InstructionKind::Call { args, .. } = &call.kind else {
        unreachable!()
    };
    assert_eq!(args, &vec![Value::operand(make_tuple_dest)]);
}

#[test]
fn test_signature_conversion_across_functions() {
    let mut module = MirModule::new();

    // callee(p: (i32, (i32, i32))) -> i32 { return p.0 }
    let mut b = TestFunctionBuilder::new("callee");
    let p = b.parameter(nested_pair_ty());
    let e = b.extract(p, 0);
    b.ret(vec![e]);
    let callee = module.add_function(b.build());

    // caller() -> i32 { return callee((10, (20, 30))) }
    let mut b = TestFunctionBuilder::new("caller");
    let c10 = b.const_i32(10);
    let c20 = b.const_i32(20);
    let c30 = b.const_i32(30);
    let inner = b.make_tuple(vec![c20, c30]);
    let t = b.make_tuple(vec![c10, inner]);
    let results = b.call(callee, vec![t], vec![MirType::i32()]);
    b.ret(results);
    module.add_function(b.build());

    assert!(DecomposeTuplesPass::new().run_on_module(&mut module).unwrap());

    let callee_fn = &module.functions[callee];
    assert_eq!(callee_fn.parameters.len(), 3);
    assert_eq!(tuple_op_count(callee_fn), 0);
    assert_eq!(
        return_values(callee_fn),
        vec![Value::operand(callee_fn.parameters[0])]
    );

    let caller_fn = module
        .lookup_function("caller")
        .map(|id| &module.functions[id])
        .expect("caller exists");
    assert_eq!(tuple_op_count(caller_fn), 0);
    let call = caller_fn.basic_blocks[caller_fn.entry_block]
        .instructions
        .iter()
        .find(|instruction| matches!(instruction.kind, InstructionKind::Call { .. }))
        .expect("call survives");
    let InstructionKind::Call { args, .. } = &call.kind else {
        unreachable!()
    };
    assert_eq!(
        args,
        &vec![
            Value::operand(c10),
            Value::operand(c20),
            Value::operand(c30)
        ]
    );
}

#[test]
fn test_block_parameters_are_converted() {
    let mut b = TestFunctionBuilder::new("block_params");
    let c1 = b.const_i32(1);
    let c2 = b.const_i32(2);
    let c3 = b.const_i32(3);
    let inner = b.make_tuple(vec![c2, c3]);
    let t = b.make_tuple(vec![c1, inner]);

    let join = b.new_block();
    let p = b.block_param(join, nested_pair_ty());
    b.jump(join, vec![t]);

    b.switch_to(join);
    let e = b.extract(p, 1);
    b.ret(vec![e]);
    let mut function = b.build();

    assert!(run(&mut function));
    assert_eq!(tuple_op_count(&function), 0);

    let join_params = &function.basic_blocks[join].params;
    assert_eq!(join_params.len(), 3);

    let entry = function.entry_block;
    let Terminator::Jump { args, .. } = &function.basic_blocks[entry].terminator else {
        panic!("expected jump");
    };
    assert_eq!(
        args,
        &vec![
            Value::operand(c1),
            Value::operand(c2),
            Value::operand(c3)
        ]
    );

    // The extract now forwards the two leaf parameters of the nested element.
    assert_eq!(
        return_values(&function),
        vec![
            Value::operand(join_params[1]),
            Value::operand(join_params[2])
        ]
    );
}

#[test]
fn test_unconverted_block_parameters_are_bridged() {
    let config = ConversionConfig {
        convert_signatures: true,
        convert_block_params: false,
    };

    let mut b = TestFunctionBuilder::new("block_param_bridge");
    let c1 = b.const_i32(1);
    let c2 = b.const_i32(2);
    let c3 = b.const_i32(3);
    let inner = b.make_tuple(vec![c2, c3]);
    let t = b.make_tuple(vec![c1, inner]);

    let join = b.new_block();
    let p = b.block_param(join, nested_pair_ty());
    b.jump(join, vec![t]);

    b.switch_to(join);
    let e = b.extract(p, 1);
    b.ret(vec![e]);
    let mut function = b.build();

    assert!(run_with(&mut function, config));

    // The jump rebuilds the structured argument (inner tuple first).
    let entry = function.entry_block;
    let entry_instructions = &function.basic_blocks[entry].instructions;
    let make_tuples: Vec<_> = entry_instructions
        .iter()
        .filter(|i| matches!(i.kind, InstructionKind::MakeTuple { .. }))
        .collect();
    assert_eq!(make_tuples.len(), 2);
    let InstructionKind::MakeTuple { dest: outer, .. } = &make_tuples[1].kind else {
        unreachable!()
    };
    let Terminator::Jump { args, .. } = &function.basic_blocks[entry].terminator else {
        panic!("expected jump");
    };
    assert_eq!(args, &vec![Value::operand(*outer)]);

    // The target block keeps its structured parameter and takes it apart.
    assert_eq!(function.basic_blocks[join].params, vec![p]);
    let join_to_elements = function.basic_blocks[join]
        .instructions
        .iter()
        .filter(|i| matches!(i.kind, InstructionKind::TupleToElements { .. }))
        .count();
    assert_eq!(join_to_elements, 2);
    assert_eq!(function.return_types, vec![MirType::i32(), MirType::i32()]);
}

#[test]
fn test_kept_instruction_operands_are_remapped() {
    let mut b = TestFunctionBuilder::new("kept_remap");
    let c1 = b.const_i32(1);
    let c2 = b.const_i32(2);
    let t = b.make_tuple(vec![c1, c2]);
    let left = b.extract(t, 0);
    let right = b.extract(t, 1);
    let sum = b.binary(crate::BinaryOp::Add, left, right);
    b.ret(vec![sum]);
    let mut function = b.build();

    assert!(run(&mut function));
    assert_eq!(tuple_op_count(&function), 0);

    let entry = function.entry_block;
    let binary = function.basic_blocks[entry]
        .instructions
        .iter()
        .find(|i| matches!(i.kind, InstructionKind::BinaryOp { .. }))
        .expect("binary op survives");
    let InstructionKind::BinaryOp { left, right, .. } = &binary.kind else {
        unreachable!()
    };
    assert_eq!(*left, Value::operand(c1));
    assert_eq!(*right, Value::operand(c2));
}

#[test]
fn test_empty_tuple_vanishes() {
    let mut b = TestFunctionBuilder::new("empty_tuple");
    let empty = b.make_empty_tuple();
    b.ret(vec![empty]);
    let mut function = b.build();

    assert!(run(&mut function));
    assert_eq!(tuple_op_count(&function), 0);
    assert!(return_values(&function).is_empty());
    assert!(function.return_types.is_empty());
}

#[test]
fn test_materializations_are_mutual_inverses() {
    // Reconstruct then decompose yields one value per original leaf, with
    // the leaf types of the tuple type, in order.
    let ty = nested_pair_ty();
    let mut function = MirFunction::new("bridge".to_string());
    let mut builder = RewriteBuilder::new(&mut function);
    let flattener = TupleFlattener::new();

    let leaves = vec![
        Value::integer(1),
        Value::integer(2),
        Value::integer(3),
    ];
    let structured = flattener
        .materialize_structured(&mut builder, &ty, &leaves)
        .unwrap();
    assert!(structured.is_operand());

    let flattened = flattener
        .materialize_flattened(&mut builder, structured)
        .unwrap();
    assert_eq!(flattened.len(), leaves.len());

    let mut expected = Vec::new();
    ty.flattened_leaf_types(&mut expected);
    let actual: Vec<MirType> = flattened
        .iter()
        .map(|value| builder.value_type(value))
        .collect();
    assert_eq!(actual, expected);
}

#[test]
fn test_reconstruct_rejects_wrong_input_count() {
    let ty = nested_pair_ty();
    let mut function = MirFunction::new("bridge".to_string());
    let mut builder = RewriteBuilder::new(&mut function);
    let flattener = TupleFlattener::new();

    let err = flattener
        .materialize_structured(&mut builder, &ty, &[Value::integer(1)])
        .unwrap_err();
    assert!(matches!(err, ConversionError::ConversionFailure { .. }));
}

#[test]
fn test_decompose_rejects_non_tuple_value() {
    let mut function = MirFunction::new("bridge".to_string());
    let leaf = function.new_typed_value_id(MirType::i32());
    let mut builder = RewriteBuilder::new(&mut function);
    let flattener = TupleFlattener::new();

    let err = flattener
        .materialize_flattened(&mut builder, Value::operand(leaf))
        .unwrap_err();
    assert!(matches!(err, ConversionError::ConversionFailure { .. }));
}

fn arb_type() -> impl Strategy<Value = MirType> {
    let leaf = prop_oneof![
        Just(MirType::i32()),
        Just(MirType::i64()),
        Just(MirType::bool()),
    ];
    leaf.prop_recursive(3, 16, 4, |inner| {
        prop::collection::vec(inner, 0..4).prop_map(MirType::tuple)
    })
}

fn arb_tuple_type() -> impl Strategy<Value = MirType> {
    prop::collection::vec(arb_type(), 0..4).prop_map(MirType::tuple)
}

proptest! {
    #[test]
    fn prop_leaf_count_matches_flattening(ty in arb_type()) {
        let flattener = TupleFlattener::new();
        let mapping = flattener.convert_types(std::slice::from_ref(&ty)).unwrap();

        prop_assert_eq!(mapping.total_converted(), ty.leaf_count());
        prop_assert!(mapping.converted_types().iter().all(MirType::is_leaf));
    }

    #[test]
    fn prop_mapping_ranges_partition(types in prop::collection::vec(arb_type(), 0..5)) {
        let flattener = TupleFlattener::new();
        let mapping = flattener.convert_types(&types).unwrap();

        let mut expected_offset = 0;
        for i in 0..mapping.len() {
            let m = mapping.input_mapping(i);
            prop_assert_eq!(m.offset, expected_offset);
            expected_offset += m.size;
        }
        prop_assert_eq!(expected_offset, mapping.total_converted());
    }

    #[test]
    fn prop_flattening_idempotent(ty in arb_type()) {
        let flattener = TupleFlattener::new();
        let first = flattener.convert_types(std::slice::from_ref(&ty)).unwrap();
        let second = flattener.convert_types(first.converted_types()).unwrap();

        prop_assert!(second.is_identity());
        prop_assert_eq!(second.converted_types(), first.converted_types());
    }

    #[test]
    fn prop_reconstruct_decompose_inverse(ty in arb_tuple_type()) {
        let mut function = MirFunction::new("bridge".to_string());
        let mut builder = RewriteBuilder::new(&mut function);
        let flattener = TupleFlattener::new();

        let leaves: Vec<Value> = (0..ty.leaf_count())
            .map(|i| Value::integer(i as i64))
            .collect();
        let structured = flattener
            .materialize_structured(&mut builder, &ty, &leaves)
            .unwrap();
        let flattened = flattener
            .materialize_flattened(&mut builder, structured)
            .unwrap();

        prop_assert_eq!(flattened.len(), leaves.len());

        let mut expected = Vec::new();
        ty.flattened_leaf_types(&mut expected);
        let actual: Vec<MirType> = flattened
            .iter()
            .map(|value| builder.value_type(value))
            .collect();
        prop_assert_eq!(actual, expected);
    }
}
