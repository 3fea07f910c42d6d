//! Benchmarks for the call-frame state machine.
//!
//! Measures whole invocations driven through `Thread::step`:
//! - Interpreted `MethodDef` calls with pooled arguments and locals
//! - `MemberRef` calls dispatched to a native bridge
//! - Signature decoding of typical method signatures

extern crate dotframe;

use std::{hint::black_box, sync::Arc};

use criterion::{criterion_group, criterion_main, Criterion};
use dotframe::{
    metadata::signatures::{parse_method_signature, ELEMENT_TYPE},
    prelude::*,
};

/// Executes a body that does nothing but `ret`
struct ReturnOnly;

impl InstructionExecutor for ReturnOnly {
    fn execute(&self, thread: &mut Thread, _context: &ExecutionContext) -> Result<bool> {
        thread.return_from_frame()?;
        Ok(true)
    }
}

fn context(domain: Arc<AppDomain>) -> ExecutionContext {
    ExecutionContext::new(domain, Arc::new(ReturnOnly))
}

/// Benchmark a static void Method(int32, int64, float64) with three initialized locals.
fn bench_interpreted_call(c: &mut Criterion) {
    let assembly = Assembly::builder("App")
        .standalone_sig(vec![
            0x07,
            0x03,
            ELEMENT_TYPE::I4,
            ELEMENT_TYPE::I8,
            ELEMENT_TYPE::R8,
        ])
        .method_def(
            vec![
                0x00,
                0x03,
                ELEMENT_TYPE::VOID,
                ELEMENT_TYPE::I4,
                ELEMENT_TYPE::I8,
                ELEMENT_TYPE::R8,
            ],
            MethodBodyFlags::INIT_LOCALS,
            Token::new(0x1100_0001),
            vec![0x2A],
        )
        .build();
    let domain = Arc::new(AppDomain::new());
    domain.register(assembly.clone());
    let context = context(domain);

    c.bench_function("step_interpreted_call", |b| {
        b.iter(|| {
            let mut thread = Thread::new(ThreadId::MAIN);
            thread.push(RawValue::I32(1));
            thread.push(RawValue::I64(2));
            thread.push(RawValue::F64(3.0));
            thread.call(assembly.clone(), Token::new(0x0600_0001));
            while thread.step(black_box(&context)).unwrap() {}
            black_box(thread)
        });
    });
}

/// Benchmark a MemberRef into a registered native assembly.
/// Signature: int32 System.Math::Max(int32, int32)
fn bench_native_call(c: &mut Criterion) {
    let signature = vec![
        0x00,
        0x02,
        ELEMENT_TYPE::I4,
        ELEMENT_TYPE::I4,
        ELEMENT_TYPE::I4,
    ];
    let caller = Assembly::builder("App")
        .assembly_ref("System.Runtime")
        .type_ref(CodedIndex::new(TableId::AssemblyRef, 1), "System", "Math")
        .member_ref(CodedIndex::new(TableId::TypeRef, 1), "Max", signature)
        .build();

    let library = NativeLibrary::new().with_function("System.Math", "Max", |args| {
        Ok(Some(if args[0].as_i64() >= args[1].as_i64() {
            args[0]
        } else {
            args[1]
        }))
    });
    let runtime = Assembly::builder("System.Runtime")
        .native_bridge(Arc::new(library))
        .build();

    let domain = Arc::new(AppDomain::new());
    domain.register(caller.clone());
    domain.register(runtime);
    let context = context(domain);

    c.bench_function("step_native_call", |b| {
        b.iter(|| {
            let mut thread = Thread::new(ThreadId::MAIN);
            thread.push(RawValue::I32(3));
            thread.push(RawValue::I32(8));
            thread.call(caller.clone(), Token::new(0x0A00_0001));
            while thread.step(black_box(&context)).unwrap() {}
            black_box(thread)
        });
    });
}

/// Benchmark decoding an instance method signature.
/// Signature: void Instance.Method(int32, string, valuetype T)
fn bench_method_signature(c: &mut Criterion) {
    // HASTHIS, 3 params, VOID return, I4, STRING, VALUETYPE TypeDef row 1
    let signature = [0x20, 0x03, 0x01, 0x08, 0x0E, 0x11, 0x04];

    c.bench_function("sig_method_instance", |b| {
        b.iter(|| {
            let sig = parse_method_signature(black_box(&signature)).unwrap();
            black_box(sig)
        });
    });
}

criterion_group!(
    benches,
    bench_interpreted_call,
    bench_native_call,
    bench_method_signature
);
criterion_main!(benches);
