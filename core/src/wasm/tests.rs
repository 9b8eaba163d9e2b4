//! Tests for the WASM simulation host

use super::*;
use crate::buffer::{BufferBinding, MAP_BUFFER_ID};
use crate::canvas::TRANSPARENT;
use crate::runtime::{Coordinator, HeadlessDriver, HeadlessOptions};
use crate::test_utils::{
    CONTRACT_WAT, FLAKY_TICK_WAT, GROWING_WAT, MISSING_TICK_WAT, NO_MAP_WAT, NOT_READY_WAT,
    SPRITE_WAT, SWAPPING_WAT, test_config,
};

const TEST_MEMORY_LIMIT: usize = 16 * 1024 * 1024;

const GREEN: [u8; 4] = [0, 255, 0, 255];
const RED: [u8; 4] = [255, 0, 0, 255];
const BLUE: [u8; 4] = [0, 0, 255, 255];
const WHITE: [u8; 4] = [255, 255, 255, 255];

fn load(wat: &str) -> SimulationHandle {
    load_with_limit(wat, TEST_MEMORY_LIMIT).unwrap()
}

fn load_with_limit(wat: &str, limit: usize) -> Result<SimulationHandle, ShellError> {
    let engine = WasmEngine::new().unwrap();
    let wasm = wat::parse_str(wat).unwrap();
    SimulationHandle::load(&engine, &wasm, limit)
}

fn load_err(wat: &str) -> ShellError {
    match load_with_limit(wat, TEST_MEMORY_LIMIT) {
        Ok(_) => panic!("module unexpectedly loaded"),
        Err(e) => e,
    }
}

fn params(width: u32, height: u32) -> GameParams {
    GameParams {
        canvas_id: "game".into(),
        width,
        height,
        palette: 2,
        tick_step_ms: 120,
        extra: -5,
    }
}

fn read_i32(handle: &SimulationHandle, offset: usize) -> i32 {
    let bytes = &handle.memory()[offset..offset + 4];
    i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

// ============================================================================
// WasmEngine Tests
// ============================================================================

#[test]
fn test_wasm_engine_creation() {
    let engine = WasmEngine::new();
    assert!(engine.is_ok());
}

#[test]
fn test_wasm_engine_load_invalid_module() {
    let engine = WasmEngine::new().unwrap();
    let result = engine.load_module(b"not valid wasm");
    assert!(result.is_err());
}

#[test]
fn test_oversized_memory_minimum_is_rejected() {
    let engine = WasmEngine::new().unwrap();
    let wasm = wat::parse_str(r#"(module (memory (export "memory") 4))"#).unwrap();
    let module = engine.load_module(&wasm).unwrap();
    assert_eq!(
        declared_memory_minimum(&module),
        Some(4 * WASM_PAGE_SIZE as u64)
    );

    let err = match SimulationHandle::instantiate(&engine, &module, 3 * WASM_PAGE_SIZE) {
        Ok(_) => panic!("oversized module instantiated"),
        Err(e) => e,
    };
    assert!(err.is_fatal());
    assert!(err.to_string().contains("requires 262144 bytes"));

    // within the limit it gets as far as the missing exports
    let err = match SimulationHandle::instantiate(&engine, &module, 4 * WASM_PAGE_SIZE) {
        Ok(_) => panic!("module without exports instantiated"),
        Err(e) => e,
    };
    assert!(err.to_string().contains("`init`"));
}

// ============================================================================
// Loading
// ============================================================================

#[test]
fn test_contract_module_loads() {
    let handle = load(CONTRACT_WAT);
    assert_eq!(handle.memory_size(), WASM_PAGE_SIZE);
    assert_eq!(handle.memory().len(), WASM_PAGE_SIZE);
}

#[test]
fn test_invalid_bytes_are_unavailable() {
    let engine = WasmEngine::new().unwrap();
    let err = match SimulationHandle::load(&engine, b"\0asm garbage", TEST_MEMORY_LIMIT) {
        Ok(_) => panic!("garbage loaded"),
        Err(e) => e,
    };
    assert!(matches!(err, ShellError::ModuleUnavailable(_)));
    assert!(err.is_fatal());
}

#[test]
fn test_not_ready_is_unavailable() {
    let err = load_err(NOT_READY_WAT);
    assert!(matches!(err, ShellError::ModuleUnavailable(_)));
    assert!(err.to_string().contains("not ready"));
}

#[test]
fn test_missing_export_is_unavailable() {
    let err = load_err(MISSING_TICK_WAT);
    assert!(matches!(err, ShellError::ModuleUnavailable(_)));
    assert!(err.to_string().contains("`tick`"), "{err}");
}

#[test]
fn test_missing_memory_is_unavailable() {
    let err = load_err(
        r#"
        (module
            (func (export "init") (result i32) (i32.const 1))
            (func (export "init_game") (param i32 i32 i32 i32 i32 i32 i32))
            (func (export "tick"))
            (func (export "draw") (param f64))
            (func (export "get_buffer") (param i32) (result i32) (i32.const 0))
        )
        "#,
    );
    assert!(err.to_string().contains("`memory`"), "{err}");
}

#[test]
fn test_mistyped_export_is_unavailable() {
    let err = load_err(
        r#"
        (module
            (memory (export "memory") 1)
            (func (export "init") (result i32) (i32.const 1))
            (func (export "init_game") (param i32 i32 i32 i32 i32 i32 i32))
            (func (export "tick") (param i32))
            (func (export "draw") (param f64))
            (func (export "get_buffer") (param i32) (result i32) (i32.const 0))
        )
        "#,
    );
    assert!(err.to_string().contains("`tick`"), "{err}");
}

#[test]
fn test_unknown_import_is_unavailable() {
    let err = load_err(
        r#"
        (module
            (import "env" "teleport" (func (param i32)))
            (memory (export "memory") 1)
        )
        "#,
    );
    assert!(matches!(err, ShellError::ModuleUnavailable(_)));
}

#[test]
fn test_trapping_init_is_unavailable() {
    let err = load_err(
        r#"
        (module
            (memory (export "memory") 1)
            (func (export "init") (result i32) unreachable)
            (func (export "init_game") (param i32 i32 i32 i32 i32 i32 i32))
            (func (export "tick"))
            (func (export "draw") (param f64))
            (func (export "get_buffer") (param i32) (result i32) (i32.const 0))
        )
        "#,
    );
    assert!(err.to_string().contains("init()"), "{err}");
}

// ============================================================================
// Entry points
// ============================================================================

#[test]
fn test_init_game_forwards_params_and_canvas_id() {
    let mut handle = load(CONTRACT_WAT);
    handle.init_game(&params(8, 8)).unwrap();

    assert_eq!(read_i32(&handle, 16), 512);
    assert_eq!(read_i32(&handle, 20), 4);
    assert_eq!(read_i32(&handle, 24), 8);
    assert_eq!(read_i32(&handle, 28), 8);
    assert_eq!(read_i32(&handle, 32), 2);
    assert_eq!(read_i32(&handle, 36), 120);
    assert_eq!(read_i32(&handle, 40), -5);
    assert_eq!(&handle.memory()[512..516], b"game");
}

#[test]
fn test_init_game_rejects_params_beyond_i32() {
    let mut handle = load(CONTRACT_WAT);
    let mut oversized = params(8, 8);
    oversized.tick_step_ms = i32::MAX as u32 + 1;

    let err = handle.init_game(&oversized).unwrap_err();
    assert!(format!("{:#}", err).contains("tick step"));
    // nothing reached the module
    assert_eq!(read_i32(&handle, 36), 0);
}

#[test]
fn test_map_buffer_reflects_ticks() {
    let mut handle = load(CONTRACT_WAT);
    handle.init_game(&params(8, 8)).unwrap();

    let mut binding = BufferBinding::acquire(&mut handle, MAP_BUFFER_ID, 8, 8).unwrap();
    assert_eq!(binding.pointer(), 1024);
    assert_eq!(binding.view(&mut handle).unwrap().pixel(0, 0), Some(GREEN));

    handle.tick().unwrap();
    handle.tick().unwrap();

    assert_eq!(read_i32(&handle, 0), 2);
    let view = binding.view(&mut handle).unwrap();
    assert_eq!(view.pixel(0, 0), Some(RED));
    assert_eq!(view.pixel(7, 7), Some(GREEN));
}

#[test]
fn test_other_buffer_ids_are_unavailable() {
    let mut handle = load(CONTRACT_WAT);
    assert_eq!(handle.buffer_pointer(0).unwrap(), 0);
    assert_eq!(handle.buffer_pointer(MAP_BUFFER_ID).unwrap(), 1024);
}

#[test]
fn test_draw_paints_under_transform() {
    let mut handle = load(CONTRACT_WAT);
    handle.init_game(&params(8, 8)).unwrap();

    let mut canvas = Canvas2d::new(8, 8);
    handle.draw(16.5, &mut canvas).unwrap();
    assert_eq!(canvas.pixel(7, 7), Some(WHITE));

    let mut panned = Canvas2d::new(8, 8);
    panned.set_transform(1.0, 0.0, 0.0, 1.0, -4.0, -4.0);
    handle.draw(0.0, &mut panned).unwrap();
    assert_eq!(panned.pixel(3, 3), Some(WHITE));
    assert_eq!(panned.pixel(7, 7), Some(TRANSPARENT));

    let instance = *handle.instance();
    let last_delta = instance
        .get_typed_func::<(), f64>(handle.store_mut(), "last_delta")
        .unwrap();
    assert_eq!(last_delta.call(handle.store_mut(), ()).unwrap(), 0.0);
}

#[test]
fn test_draw_pixels_reads_module_memory() {
    let mut handle = load(SPRITE_WAT);
    handle.init_game(&params(4, 4)).unwrap();

    let mut canvas = Canvas2d::new(4, 4);
    handle.draw(0.0, &mut canvas).unwrap();

    assert_eq!(canvas.pixel(1, 1), Some(RED));
    assert_eq!(canvas.pixel(2, 1), Some(BLUE));
    // the out-of-range sprite was skipped
    assert_eq!(canvas.pixel(0, 0), Some(TRANSPARENT));

    let instance = *handle.instance();
    let width_seen = instance
        .get_typed_func::<(), i32>(handle.store_mut(), "width_seen")
        .unwrap();
    assert_eq!(width_seen.call(handle.store_mut(), ()).unwrap(), 4);
}

#[test]
fn test_canvas_returned_after_draw_fault() {
    let mut handle = load(
        r#"
        (module
            (import "env" "fill_rect" (func $fill_rect (param f32 f32 f32 f32 i32)))
            (memory (export "memory") 1)
            (func (export "init") (result i32) (i32.const 1))
            (func (export "init_game") (param i32 i32 i32 i32 i32 i32 i32))
            (func (export "tick"))
            (func (export "draw") (param f64)
                (call $fill_rect (f32.const 0) (f32.const 0) (f32.const 2) (f32.const 2) (i32.const 0xFFFFFFFF))
                unreachable)
            (func (export "get_buffer") (param i32) (result i32) (i32.const 0))
        )
        "#,
    );
    let mut canvas = Canvas2d::new(4, 4);
    let err = handle.draw(0.0, &mut canvas).unwrap_err();

    assert!(err.to_string().contains("draw()"));
    assert_eq!(canvas.width(), 4);
    assert_eq!(canvas.pixel(1, 1), Some(WHITE));
    assert!(!handle.store().data().in_draw);
}

#[test]
fn test_tick_trap_keeps_instance_usable() {
    let mut handle = load(FLAKY_TICK_WAT);

    let err = handle.tick().unwrap_err();
    assert_eq!(err.to_string(), "WASM tick() failed");
    assert!(format!("{:#}", err).contains("unreachable"));

    handle.tick().unwrap();
    assert_eq!(read_i32(&handle, 0), 2);
}

// ============================================================================
// Memory growth
// ============================================================================

#[test]
fn test_binding_follows_memory_growth() {
    let mut handle = load(GROWING_WAT);
    let mut binding = BufferBinding::acquire(&mut handle, MAP_BUFFER_ID, 4, 4).unwrap();
    assert_eq!(binding.pointer(), 1024);

    handle.tick().unwrap();
    assert_eq!(handle.memory_size(), 2 * WASM_PAGE_SIZE);
    assert!(binding.is_stale(&handle));

    let view = binding.view(&mut handle).unwrap();
    assert_eq!(view.pixel(0, 0), Some(BLUE));
    assert_eq!(binding.pointer(), 65536);
}

#[test]
fn test_memory_limit_denies_growth() {
    let mut handle = load_with_limit(GROWING_WAT, WASM_PAGE_SIZE).unwrap();
    handle.tick().unwrap();
    assert_eq!(handle.memory_size(), WASM_PAGE_SIZE);
    assert_eq!(handle.buffer_pointer(MAP_BUFFER_ID).unwrap(), 1024);
}

#[test]
fn test_coordinator_keeps_map_when_growth_denied() {
    let handle = load_with_limit(GROWING_WAT, WASM_PAGE_SIZE).unwrap();
    let mut coordinator = Coordinator::start(&test_config(4, 4), handle, 0.0).unwrap();
    run_for(&mut coordinator, 250.0);

    let stats = coordinator.stats();
    assert_eq!(stats.ticks, 2);
    assert_eq!(stats.tick_faults, 0);
    assert!(coordinator.map_enabled());
    assert_eq!(coordinator.simulation().memory_size(), WASM_PAGE_SIZE);
    // the map never moved, so the untouched page-0 buffer is what shows
    assert_eq!(coordinator.visible().pixel(0, 0), Some(TRANSPARENT));
}

#[test]
fn test_coordinator_follows_map_swapped_in_place() {
    let handle = load(SWAPPING_WAT);
    let mut coordinator = Coordinator::start(&test_config(4, 4), handle, 0.0).unwrap();

    coordinator.on_animation_frame(16.0);
    assert_eq!(coordinator.visible().pixel(0, 0), Some(GREEN));

    coordinator.on_tick_timer(100.0);
    coordinator.on_animation_frame(116.0);

    assert_eq!(coordinator.simulation().memory_size(), WASM_PAGE_SIZE);
    assert!(coordinator.map_enabled());
    assert_eq!(coordinator.visible().pixel(0, 0), Some(BLUE));
}

// ============================================================================
// Coordinator integration
// ============================================================================

fn run_for(coordinator: &mut Coordinator<SimulationHandle>, duration_ms: f64) {
    let driver = HeadlessDriver::new(HeadlessOptions {
        duration_ms,
        refresh_hz: 60,
        realtime: false,
    });
    driver.run(coordinator, 0.0, |_| {});
}

#[test]
fn test_coordinator_drives_contract_module() {
    let handle = load(CONTRACT_WAT);
    let mut coordinator = Coordinator::start(&test_config(8, 8), handle, 0.0).unwrap();
    run_for(&mut coordinator, 1000.0);

    let stats = coordinator.stats();
    assert_eq!(stats.ticks, 10);
    assert_eq!(stats.tick_faults, 0);
    assert_eq!(read_i32(coordinator.simulation(), 0), 10);

    let visible = coordinator.visible();
    assert_eq!(visible.pixel(0, 0), Some(RED));
    assert_eq!(visible.pixel(3, 3), Some(GREEN));
    assert_eq!(visible.pixel(7, 7), Some(WHITE));
}

#[test]
fn test_coordinator_without_map_buffer() {
    let handle = load(NO_MAP_WAT);
    let mut coordinator = Coordinator::start(&test_config(4, 4), handle, 0.0).unwrap();
    assert!(!coordinator.map_enabled());

    run_for(&mut coordinator, 100.0);

    assert!(coordinator.stats().draws > 0);
    assert_eq!(coordinator.stats().draw_faults, 0);
    assert_eq!(coordinator.visible().pixel(0, 0), Some(BLUE));
    assert_eq!(coordinator.visible().pixel(2, 2), Some(TRANSPARENT));
}

#[test]
fn test_coordinator_survives_flaky_ticks() {
    let handle = load(FLAKY_TICK_WAT);
    let mut coordinator = Coordinator::start(&test_config(4, 4), handle, 0.0).unwrap();
    run_for(&mut coordinator, 1000.0);

    let stats = coordinator.stats();
    assert_eq!(stats.ticks, 10);
    assert_eq!(stats.tick_faults, 5);
    assert_eq!(coordinator.next_tick_deadline(), Some(1100.0));
}

#[test]
fn test_coordinator_reacquires_map_after_growth() {
    let handle = load(GROWING_WAT);
    let mut coordinator = Coordinator::start(&test_config(4, 4), handle, 0.0).unwrap();
    run_for(&mut coordinator, 250.0);

    assert!(coordinator.map_enabled());
    assert_eq!(coordinator.simulation().memory_size(), 2 * WASM_PAGE_SIZE);
    assert_eq!(coordinator.visible().pixel(0, 0), Some(BLUE));
}
