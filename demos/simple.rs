use procpack::{encode, pack, register, size, unpack, Handle, Instance, Value};

fn empty_dict(_args: &[Value]) -> procpack::Result<Value> {
    Ok(Value::Dict(Vec::new()))
}

fn main() {
    // Register a class so that instance reductions naming it reconstruct
    // into a plain Dict (OrderedDict's closest structural analog here).
    register(Handle::class_with_constructor(
        "collections",
        "OrderedDict",
        empty_dict,
    ))
    .unwrap();

    let post = Value::Dict(vec![
        (
            Value::Str("text".to_string()),
            Value::Str("This is my very first post.".to_string()),
        ),
        (Value::Str("time".to_string()), Value::Int(1_700_000_000)),
    ]);
    let bytes = pack(&post).unwrap();
    println!("packed {} bytes: {:02x?}", bytes.len(), bytes);
    let back = unpack(&bytes).unwrap();
    assert_eq!(back, post);

    // An instance reduction naming a registered class, carrying its
    // key/value pairs as the `update` slot (§4.4(c)): since the constructed
    // object is a Dict, not a Dict-shaped `state`, update's pair-iteration
    // fallback is what applies them.
    let ordered = Value::Instance(Box::new(Instance {
        callable: Value::ClassRef {
            module: "collections".to_string(),
            qualname: "OrderedDict".to_string(),
        },
        args: vec![],
        state: None,
        extend: None,
        update: Some(Value::List(vec![
            Value::Tuple(vec![Value::Str("a".to_string()), Value::Int(1)]),
            Value::Tuple(vec![Value::Str("b".to_string()), Value::Int(2)]),
        ])),
    }));
    let framed = encode(&ordered).unwrap();
    println!("framed instance: {} bytes", framed.len());
    let width = framed[0] as usize;
    let payload_len = size(&framed[1..1 + width]).unwrap() as usize;
    let reconstructed = unpack(&framed[1 + width..1 + width + payload_len]).unwrap();
    assert_eq!(
        reconstructed,
        Value::Dict(vec![
            (Value::Str("a".to_string()), Value::Int(1)),
            (Value::Str("b".to_string()), Value::Int(2)),
        ])
    );
}
