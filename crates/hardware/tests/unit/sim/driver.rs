//! # Driver Tests
//!
//! The per-cycle protocol: halt, weight feed with hold, host reads with hold,
//! host writes, same-cycle ordering, and the optional cycle cap.

use std::collections::BTreeMap;

use mockall::Sequence;
use num_bigint::BigUint;
use pretty_assertions::assert_eq;
use tpusim_core::common::SimError;
use tpusim_core::config::Config;
use tpusim_core::memory::MemoryImage;
use tpusim_core::sim::driver::{CoSimDriver, DriverState};
use tpusim_core::sim::engine::Signal;
use tpusim_core::sim::loader::Program;
use tpusim_core::trace::{NullTrace, SignalHistory};

use crate::common::builder::script::ScriptBuilder;
use crate::common::harness::{
    ScriptedCore, driver, driver_with_config, image, three_tiles, tiny_program,
};
use crate::common::mocks::engine::{MockEngine, report};

fn weights_seen(core: &ScriptedCore) -> Vec<BigUint> {
    core.seen.iter().map(|inputs| inputs.weights_in.clone()).collect()
}

fn rdata_seen(core: &ScriptedCore) -> Vec<BigUint> {
    core.seen.iter().map(|inputs| inputs.hostmem_rdata.clone()).collect()
}

fn big(values: &[u64]) -> Vec<BigUint> {
    values.iter().map(|&v| BigUint::from(v)).collect()
}

#[test]
fn construction_preloads_imem_and_seeds_inputs() {
    let driver = driver(ScriptBuilder::new().halt().build(), image(&[]), three_tiles());
    assert_eq!(driver.engine().imem, tiny_program().memory_map());
    assert_eq!(driver.inputs().weights_in, BigUint::from(0xa0u32));
    assert_eq!(driver.inputs().hostmem_rdata, BigUint::from(0u32));
    assert_eq!(driver.windex(), 0);
    assert_eq!(driver.state(), DriverState::Running);
    assert_eq!(driver.engine().cycles(), 0);
}

#[test]
fn empty_weight_memory_is_fatal_before_any_cycle() {
    let result = CoSimDriver::new(
        ScriptedCore::new(ScriptBuilder::new().halt().build()),
        &tiny_program(),
        image(&[(0, 1)]),
        MemoryImage::new(),
        &Config::default(),
    );
    assert!(matches!(result, Err(SimError::EmptyWeightMemory)));
}

#[test]
fn weights_without_tile_zero_are_rejected() {
    let result = CoSimDriver::new(
        ScriptedCore::default(),
        &tiny_program(),
        MemoryImage::new(),
        image(&[(1, 0xa1)]),
        &Config::default(),
    );
    assert!(matches!(result, Err(SimError::EmptyWeightMemory)));
}

#[test]
fn halt_on_first_cycle_runs_exactly_one_cycle() {
    let mut driver = driver(
        ScriptBuilder::new().halt_with_requests().build(),
        image(&[(0, 0x11)]),
        three_tiles(),
    );
    let cycles = driver.run(&mut NullTrace).unwrap();
    assert_eq!(cycles, 1);
    assert!(driver.is_halted());
    // Requests asserted alongside halt are ignored.
    assert_eq!(driver.windex(), 0);
    assert_eq!(driver.hostmem(), &image(&[(0, 0x11)]));
    assert_eq!(driver.stats().host_writes, 0);
    assert_eq!(driver.stats().weight_advances, 0);
}

#[test]
fn step_after_halt_is_a_no_op() {
    let mut driver = driver(ScriptBuilder::new().halt().build(), image(&[]), three_tiles());
    assert_eq!(driver.step_cycle(&mut NullTrace).unwrap(), DriverState::Halted);
    assert_eq!(driver.step_cycle(&mut NullTrace).unwrap(), DriverState::Halted);
    assert_eq!(driver.engine().cycles(), 1);
}

#[test]
fn weight_advance_holds_past_last_tile() {
    let script = ScriptBuilder::new()
        .read_weights()
        .read_weights()
        .read_weights()
        .read_weights()
        .idle()
        .halt()
        .build();
    let mut driver = driver(script, image(&[]), three_tiles());
    let _ = driver.run(&mut NullTrace).unwrap();

    assert_eq!(
        weights_seen(driver.engine()),
        big(&[0xa0, 0xa1, 0xa2, 0xa2, 0xa2, 0xa2])
    );
    assert_eq!(driver.windex(), 4);
    assert_eq!(driver.stats().weight_advances, 2);
    assert_eq!(driver.stats().weight_holds, 2);
}

#[test]
fn single_tile_is_held_forever() {
    let script = ScriptBuilder::new().read_weights().read_weights().halt().build();
    let mut driver = driver(script, image(&[]), image(&[(0, 0x55)]));
    let _ = driver.run(&mut NullTrace).unwrap();
    assert_eq!(weights_seen(driver.engine()), big(&[0x55, 0x55, 0x55]));
}

#[test]
fn weight_gap_holds_then_resumes() {
    let script = ScriptBuilder::new().read_weights().read_weights().halt().build();
    let mut driver = driver(script, image(&[]), image(&[(0, 0xa0), (2, 0xa2)]));
    let _ = driver.run(&mut NullTrace).unwrap();
    assert_eq!(weights_seen(driver.engine()), big(&[0xa0, 0xa0, 0xa2]));
}

#[test]
fn host_read_is_presented_next_cycle() {
    let script = ScriptBuilder::new().read(1).idle().read(0).halt().build();
    let mut driver = driver(script, image(&[(0, 0x10), (1, 0x20)]), three_tiles());
    let _ = driver.run(&mut NullTrace).unwrap();
    assert_eq!(rdata_seen(driver.engine()), big(&[0, 0x20, 0x20, 0x10]));
    assert_eq!(driver.stats().host_reads, 2);
}

#[test]
fn host_read_miss_holds_previous_data() {
    let script = ScriptBuilder::new().read(0).read(99).idle().halt().build();
    let mut driver = driver(script, image(&[(0, 0x10)]), three_tiles());
    let _ = driver.run(&mut NullTrace).unwrap();
    assert_eq!(rdata_seen(driver.engine()), big(&[0, 0x10, 0x10, 0x10]));
    assert_eq!(driver.stats().host_read_misses, 1);
}

#[test]
fn wide_read_address_is_a_miss() {
    let wide = BigUint::from(1u32) << 70u32;
    let script = ScriptBuilder::new().read_wide(wide).halt().build();
    let mut driver = driver(script, image(&[(0, 0x10)]), three_tiles());
    let _ = driver.run(&mut NullTrace).unwrap();
    assert_eq!(rdata_seen(driver.engine()), big(&[0, 0]));
    assert_eq!(driver.stats().host_read_misses, 1);
}

#[test]
fn host_write_creates_and_overwrites() {
    let script = ScriptBuilder::new()
        .write(5, 0x77)
        .write(0, 0x99)
        .halt()
        .build();
    let mut driver = driver(script, image(&[(0, 0x10)]), three_tiles());
    let _ = driver.run(&mut NullTrace).unwrap();
    assert_eq!(driver.hostmem(), &image(&[(0, 0x99), (5, 0x77)]));
    assert_eq!(driver.stats().host_writes, 2);
}

#[test]
fn write_then_read_sees_written_value() {
    let script = ScriptBuilder::new().write(3, 0x42).read(3).idle().halt().build();
    let mut driver = driver(script, image(&[]), three_tiles());
    let _ = driver.run(&mut NullTrace).unwrap();
    assert_eq!(rdata_seen(driver.engine()), big(&[0, 0, 0x42, 0x42]));
}

#[test]
fn same_cycle_read_sees_pre_write_state() {
    let script = ScriptBuilder::new()
        .read_write(0, 0, 0xbb)
        .read(0)
        .halt()
        .build();
    let mut driver = driver(script, image(&[(0, 0xaa)]), three_tiles());
    let _ = driver.run(&mut NullTrace).unwrap();
    assert_eq!(rdata_seen(driver.engine()), big(&[0, 0xaa, 0xbb]));
    assert_eq!(driver.hostmem().get(0), Some(&BigUint::from(0xbbu32)));
}

#[test]
fn same_cycle_read_of_new_address_misses() {
    let script = ScriptBuilder::new().read_write(8, 8, 0xcc).halt().build();
    let mut driver = driver(script, image(&[]), three_tiles());
    let _ = driver.run(&mut NullTrace).unwrap();
    assert_eq!(rdata_seen(driver.engine()), big(&[0, 0]));
    assert_eq!(driver.stats().host_read_misses, 1);
    assert!(driver.hostmem().contains(8));
}

#[test]
fn wide_write_address_is_fatal() {
    let wide = BigUint::from(1u32) << 64u32;
    let script = ScriptBuilder::new().write_wide(wide.clone(), 1).halt().build();
    let mut driver = driver(script, image(&[]), three_tiles());
    let err = driver.run(&mut NullTrace).unwrap_err();
    assert!(matches!(err, SimError::HostAddressOutOfRange(addr) if addr == wide));
}

#[test]
fn cycle_cap_aborts_non_halting_core() {
    let config = Config::from_json(r#"{"general": {"max_cycles": 10}}"#).unwrap();
    let mut driver = driver_with_config(Vec::new(), image(&[]), three_tiles(), &config);
    let err = driver.run(&mut NullTrace).unwrap_err();
    assert!(matches!(err, SimError::CycleLimitExceeded { cycles: 10 }));
    assert_eq!(driver.engine().cycles(), 10);
}

#[test]
fn halt_on_cap_cycle_is_not_an_error() {
    let config = Config::from_json(r#"{"general": {"max_cycles": 3}}"#).unwrap();
    let script = ScriptBuilder::new().idle_for(2).halt().build();
    let mut driver = driver_with_config(script, image(&[]), three_tiles(), &config);
    assert_eq!(driver.run(&mut NullTrace).unwrap(), 3);
}

#[test]
fn engine_errors_propagate() {
    let mut core = ScriptedCore::new(ScriptBuilder::new().idle_for(5).build());
    core.fail_on_cycle = Some(2);
    let mut driver =
        CoSimDriver::new(core, &tiny_program(), image(&[]), three_tiles(), &Config::default())
            .unwrap();
    assert!(matches!(driver.run(&mut NullTrace), Err(SimError::Engine(_))));
    assert_eq!(driver.engine().cycles(), 2);
    assert_eq!(driver.state(), DriverState::Running);
}

#[test]
fn history_records_every_cycle() {
    let script = ScriptBuilder::new().read_weights().read(0).write(1, 9).halt().build();
    let mut driver = driver(script, image(&[(0, 0x10)]), three_tiles());
    let mut history = SignalHistory::new();
    let _ = driver.run(&mut history).unwrap();

    let records = history.records();
    assert_eq!(records.len(), 4);
    assert!(records[0].read_weights);
    assert_eq!(records[1].read, Some(BigUint::from(0u32)));
    assert_eq!(records[1].inputs.weights_in, BigUint::from(0xa1u32));
    assert_eq!(records[2].write, Some((BigUint::from(1u32), BigUint::from(9u32))));
    assert_eq!(records[2].inputs.hostmem_rdata, BigUint::from(0x10u32));
    assert!(records[3].halt);
    let cycles: Vec<u64> = records.iter().map(|r| r.cycle).collect();
    assert_eq!(cycles, vec![0, 1, 2, 3]);
}

#[test]
fn end_to_end_dump_of_untouched_host_memory() {
    let program = Program::decode(&[0u8; 4 * 14], 112).unwrap();
    assert_eq!(program.len(), 4);
    let hostmem = MemoryImage::from_vectors(&[vec![1i64, 2], vec![3, 4]], 8);
    let weights = MemoryImage::from_tiles(&[vec![vec![5i64, 6], vec![7, 8]]], 8);
    let script = ScriptBuilder::new().idle_for(3).halt().build();

    let mut driver = CoSimDriver::new(
        ScriptedCore::new(script),
        &program,
        hostmem,
        weights,
        &Config::default(),
    )
    .unwrap();
    let _ = driver.run(&mut NullTrace).unwrap();

    let (core, hostmem, _) = driver.into_parts();
    assert_eq!(core.imem.len(), 4);
    assert_eq!(hostmem.render_vectors(8), "0 [1, 2]\n1 [3, 4]\n");
}

#[test]
fn mock_engine_sees_protocol_in_order() {
    let mut engine = MockEngine::new();
    let mut seq = Sequence::new();
    let _ = engine
        .expect_load_instruction_memory()
        .withf(|words: &BTreeMap<u64, BigUint>| words.len() == 2)
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(()));
    let _ = engine
        .expect_step()
        .withf(|inputs| inputs.weights_in == BigUint::from(0xa0u32))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(()));
    report(&mut engine, Signal::Halt, 1);

    let mut driver =
        CoSimDriver::new(engine, &tiny_program(), image(&[]), three_tiles(), &Config::default())
            .unwrap();
    assert_eq!(driver.run(&mut NullTrace).unwrap(), 1);
}

#[test]
fn mock_engine_skips_address_sampling_without_enables() {
    let mut engine = MockEngine::new();
    let _ = engine.expect_load_instruction_memory().returning(|_| Ok(()));
    let _ = engine.expect_step().times(1).returning(|_| Ok(()));
    report(&mut engine, Signal::Halt, 0);
    report(&mut engine, Signal::ReadWeights, 0);
    report(&mut engine, Signal::HostmemRe, 0);
    report(&mut engine, Signal::HostmemWe, 0);

    let mut driver =
        CoSimDriver::new(engine, &tiny_program(), image(&[]), three_tiles(), &Config::default())
            .unwrap();
    // No expectation exists for the address or data signals; sampling them would panic.
    assert_eq!(driver.step_cycle(&mut NullTrace).unwrap(), DriverState::Running);
}
