//! Compile and execute benchmarks for the Quill VM.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use quill::vm::{Bytecode, Vm, VmConfig};

const FIB: &str = r#"
function fib(n) {
    if n < 2 { return n }
    return fib(n - 1) + fib(n - 2)
}
result = fib(N)
"#;

const LOOP_SUM: &str = r#"
total = 0
i = 0
while i < N {
    total = total + i
    i = i + 1
}
"#;

const COLLECTIONS: &str = r#"
items = []
i = 0
while i < N {
    push(items, i * 2)
    i = i + 1
}
counts = {}
for item in items {
    counts[str(item % 10)] = item
}
sum = 0
for key in keys(counts) {
    sum = sum + counts[key]
}
"#;

fn compile(template: &str, n: usize) -> Bytecode {
    let source = template.replace('N', &n.to_string());
    quill::compile_source(&source).expect("compile error")
}

fn execute(bytecode: &Bytecode) {
    let mut vm = Vm::new(VmConfig::default(), std::io::sink());
    vm.run(bytecode).expect("runtime error");
}

fn fibonacci_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("fibonacci");

    for n in [10, 15, 20] {
        let bytecode = compile(FIB, n);
        group.bench_with_input(BenchmarkId::new("recursive", n), &bytecode, |b, code| {
            b.iter(|| execute(black_box(code)))
        });
    }

    group.finish();
}

fn loop_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("loops");

    let bytecode = compile(LOOP_SUM, 10_000);
    group.bench_function("sum_10000", |b| b.iter(|| execute(black_box(&bytecode))));

    let bytecode = compile(COLLECTIONS, 1_000);
    group.bench_function("collections_1000", |b| {
        b.iter(|| execute(black_box(&bytecode)))
    });

    group.finish();
}

fn compile_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");

    let source = FIB.replace('N', "20");
    group.bench_function("fib", |b| {
        b.iter(|| quill::compile_source(black_box(&source)).expect("compile error"))
    });

    group.finish();
}

criterion_group!(
    benches,
    fibonacci_benchmarks,
    loop_benchmarks,
    compile_benchmarks
);
criterion_main!(benches);
