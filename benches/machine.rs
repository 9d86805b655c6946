#![allow(clippy::unusual_byte_groupings)] // so we can group bits by instruction parts

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use lc3vm::{Machine, Word};

/// A small instruction mix covering the ALU, loads, stores and branches.
/// The final branch loops back to the start so the machine can step
/// forever.
fn load_mix(machine: &mut Machine) {
    machine
        .load_words(
            Word::new(0x3000),
            &[
                0b0001_001_001_1_00101, // ADD R1, R1, #5
                0b0001_010_001_0_00_001, // ADD R2, R1, R1
                0b0101_011_001_1_00011, // AND R3, R1, #3
                0b1001_101_001_111111,  // NOT R5, R1
                0b0010_110_000000100,   // LD R6, #4
                0b1110_010_000000010,   // LEA R2, #2
                0b0011_001_000000011,   // ST R1, #3
                0b0000_111_111111000,   // BRnzp #-8
                0x0000,
                0x0000,
                0x0000,
            ]
            .map(Word::new),
        )
        .expect("load benchmark program");
}

fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("step instruction mix", |b| {
        let mut machine = Machine::new();
        load_mix(&mut machine);
        b.iter(|| {
            black_box(machine.step()).expect("step");
        });
    });

    c.bench_function("run 1000 instructions", |b| {
        let mut machine = Machine::new();
        b.iter(|| {
            machine.reset();
            load_mix(&mut machine);
            machine.run_steps(black_box(1000)).expect("run");
        });
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
