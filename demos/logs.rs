//! Throughput demo: generate a pile of synthetic access-log records, pack
//! each one, then repeatedly unpack the whole batch and report progress,
//! mirroring the kind of decode-throughput check a schema-validating codec
//! would run against a large corpus of real documents.

use procpack::Value;
use rand::Rng;

fn random_log<R: Rng>(rng: &mut R) -> Value {
    const USERID: [&str; 9] = [
        "-", "alice", "bob", "carmen", "david", "eric", "frank", "george", "harry",
    ];
    const METHODS: [&str; 5] = ["GET", "POST", "PUT", "UPDATE", "DELETE"];
    const ROUTES: [&str; 7] = [
        "/favicon.ico",
        "/css/index.css",
        "/css/font-awesome.min.css",
        "/img/logo-full.svg",
        "/img/splash.jpg",
        "/api/login",
        "/api/logout",
    ];
    const CODES: [i64; 12] = [
        100, 101, 200, 201, 204, 301, 302, 400, 404, 408, 500, 503,
    ];

    let request = format!(
        "{} {} HTTP/1.1",
        METHODS[rng.gen_range(0..METHODS.len())],
        ROUTES[rng.gen_range(0..ROUTES.len())],
    );
    let address = Value::Tuple(vec![
        Value::Int(rng.gen_range(0..=255)),
        Value::Int(rng.gen_range(0..=255)),
        Value::Int(rng.gen_range(0..=255)),
        Value::Int(rng.gen_range(0..=255)),
    ]);

    Value::Dict(vec![
        (Value::Str("address".to_string()), address),
        (
            Value::Str("code".to_string()),
            Value::Int(CODES[rng.gen_range(0..CODES.len())]),
        ),
        (
            Value::Str("userid".to_string()),
            Value::Str(USERID[rng.gen_range(0..USERID.len())].to_string()),
        ),
        (Value::Str("request".to_string()), Value::Str(request)),
        (
            Value::Str("size".to_string()),
            Value::UInt(rng.gen_range(0..100_000_000)),
        ),
    ])
}

fn main() {
    let mut rng = rand::thread_rng();
    const LOGS: usize = 10_000;

    let logs: Vec<Value> = (0..LOGS).map(|_| random_log(&mut rng)).collect();
    let packed: Vec<Vec<u8>> = logs
        .iter()
        .map(|log| procpack::pack(log).unwrap())
        .collect();
    let total_bytes: usize = packed.iter().map(Vec::len).sum();
    println!(
        "packed {} log records into {} bytes ({:.1} bytes/record)",
        LOGS,
        total_bytes,
        total_bytes as f64 / LOGS as f64
    );

    for round in 0..10 {
        let decoded: Vec<Value> = packed
            .iter()
            .map(|bytes| procpack::unpack(bytes).unwrap())
            .collect();
        println!("round #{}: decoded {} records", round, decoded.len());
        assert_eq!(decoded, logs, "round-trip must be lossless");
    }
}
