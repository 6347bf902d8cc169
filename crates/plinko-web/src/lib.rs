pub mod runner;

pub use runner::PlinkoRunner;

use std::cell::RefCell;

use plinko_engine::{EngineConfig, RiskLevel};
use wasm_bindgen::prelude::*;

thread_local! {
    static RUNNER: RefCell<Option<PlinkoRunner>> = const { RefCell::new(None) };
}

/// Run `f` against the runner.
///
/// `None` when the runner is not initialized, or when a call arrives while
/// another one still holds the runner. Such a call is dropped, never queued.
fn with_runner<R>(f: impl FnOnce(&mut PlinkoRunner) -> R) -> Option<R> {
    RUNNER.with(|cell| {
        let Ok(mut borrow) = cell.try_borrow_mut() else {
            log::warn!("Runner busy: dropping re-entrant call");
            return None;
        };
        match borrow.as_mut() {
            Some(runner) => Some(f(runner)),
            None => {
                log::warn!("Runner not initialized. Call plinko_init() first.");
                None
            }
        }
    })
}

fn install(config: EngineConfig) {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);

    let mut runner = PlinkoRunner::new(config);
    if let Err(e) = runner.init() {
        log::error!("plinko: failed to build initial board: {}", e);
    }
    RUNNER.with(|cell| {
        if let Ok(mut slot) = cell.try_borrow_mut() {
            *slot = Some(runner);
        }
    });
    log::info!("plinko: initialized");
}

#[wasm_bindgen]
pub fn plinko_init() {
    install(EngineConfig::default());
}

#[wasm_bindgen]
pub fn plinko_init_seeded(seed: u32) {
    install(EngineConfig::default().with_seed(seed as u64));
}

/// Load engine tuning from JSON. Falls back to defaults on a parse error.
#[wasm_bindgen]
pub fn plinko_init_with_config(json: &str) {
    let config = EngineConfig::from_json(json).unwrap_or_else(|e| {
        log::error!("plinko: bad config, using defaults: {}", e);
        EngineConfig::default()
    });
    install(config);
}

/// `risk`: 0 = Low, 1 = Medium, 2 = High.
#[wasm_bindgen]
pub fn plinko_configure(rows: u8, risk: u8) -> bool {
    let risk = match RiskLevel::try_from(risk) {
        Ok(risk) => risk,
        Err(e) => {
            log::warn!("plinko: configure rejected: {}", e);
            return false;
        }
    };
    match with_runner(|r| r.configure(rows, risk)) {
        Some(Ok(())) => true,
        Some(Err(e)) => {
            log::warn!("plinko: configure rejected: {}", e);
            false
        }
        None => false,
    }
}

#[wasm_bindgen]
pub fn plinko_tick(dt: f32) {
    if let Some(Err(e)) = with_runner(|r| r.tick(dt)) {
        log::error!("plinko: frame failed: {}", e);
    }
}

#[wasm_bindgen]
pub fn plinko_teardown() {
    with_runner(|r| r.teardown());
}

// ---- Betting ----

/// Returns `false` when the bet was rejected (e.g. insufficient balance).
#[wasm_bindgen]
pub fn plinko_drop_ball() -> bool {
    match with_runner(|r| r.drop_ball()) {
        Some(Ok(_)) => true,
        Some(Err(e)) => {
            log::info!("plinko: {}", e);
            false
        }
        None => false,
    }
}

#[wasm_bindgen]
pub fn plinko_set_bet(amount: f64) -> bool {
    matches!(with_runner(|r| r.session_mut().set_bet_amount(amount)), Some(Ok(())))
}

#[wasm_bindgen]
pub fn plinko_halve_bet() {
    with_runner(|r| r.session_mut().halve_bet());
}

#[wasm_bindgen]
pub fn plinko_double_bet() {
    with_runner(|r| r.session_mut().double_bet());
}

#[wasm_bindgen]
pub fn plinko_add_funds(amount: f64) -> bool {
    matches!(with_runner(|r| r.session_mut().add_funds(amount)), Some(Ok(())))
}

/// Bet `count` times, one every half second. A `count` of 0 places only the
/// immediate first bet.
#[wasm_bindgen]
pub fn plinko_auto_start(count: u32) {
    with_runner(|r| r.auto_start(count));
}

#[wasm_bindgen]
pub fn plinko_auto_stop() {
    with_runner(|r| r.auto_stop());
}

#[wasm_bindgen]
pub fn plinko_is_auto_betting() -> bool {
    with_runner(|r| r.is_auto_betting()).unwrap_or(false)
}

// ---- Session getters ----

#[wasm_bindgen]
pub fn get_balance() -> f64 {
    with_runner(|r| r.session().balance()).unwrap_or(0.0)
}

#[wasm_bindgen]
pub fn get_bet_amount() -> f64 {
    with_runner(|r| r.session().bet_amount()).unwrap_or(0.0)
}

#[wasm_bindgen]
pub fn get_profit() -> f64 {
    with_runner(|r| r.session().stats().profit).unwrap_or(0.0)
}

#[wasm_bindgen]
pub fn get_wins() -> u32 {
    with_runner(|r| r.session().stats().wins).unwrap_or(0)
}

#[wasm_bindgen]
pub fn get_losses() -> u32 {
    with_runner(|r| r.session().stats().losses).unwrap_or(0)
}

// ---- Buffer accessors ----

#[wasm_bindgen]
pub fn get_balls_ptr() -> *const f32 {
    with_runner(|r| r.balls_ptr()).unwrap_or(std::ptr::null())
}

#[wasm_bindgen]
pub fn get_ball_count() -> u32 {
    with_runner(|r| r.ball_count()).unwrap_or(0)
}

#[wasm_bindgen]
pub fn get_effects_ptr() -> *const f32 {
    with_runner(|r| r.effects_ptr()).unwrap_or(std::ptr::null())
}

#[wasm_bindgen]
pub fn get_effect_count() -> u32 {
    with_runner(|r| r.effect_count()).unwrap_or(0)
}

#[wasm_bindgen]
pub fn get_outcomes_ptr() -> *const f64 {
    with_runner(|r| r.outcomes_ptr()).unwrap_or(std::ptr::null())
}

#[wasm_bindgen]
pub fn get_outcome_count() -> u32 {
    with_runner(|r| r.outcome_count()).unwrap_or(0)
}

#[wasm_bindgen]
pub fn get_pegs_ptr() -> *const f32 {
    with_runner(|r| r.pegs_ptr()).unwrap_or(std::ptr::null())
}

#[wasm_bindgen]
pub fn get_peg_count() -> u32 {
    with_runner(|r| r.peg_count()).unwrap_or(0)
}

#[wasm_bindgen]
pub fn get_buckets_ptr() -> *const f32 {
    with_runner(|r| r.buckets_ptr()).unwrap_or(std::ptr::null())
}

#[wasm_bindgen]
pub fn get_bucket_count() -> u32 {
    with_runner(|r| r.bucket_count()).unwrap_or(0)
}

#[wasm_bindgen]
pub fn get_history_ptr() -> *const f64 {
    with_runner(|r| r.history_ptr()).unwrap_or(std::ptr::null())
}

#[wasm_bindgen]
pub fn get_history_len() -> u32 {
    with_runner(|r| r.history_len()).unwrap_or(0)
}

#[wasm_bindgen]
pub fn get_world_width() -> f32 {
    with_runner(|r| r.world_width()).unwrap_or(0.0)
}

#[wasm_bindgen]
pub fn get_world_height() -> f32 {
    with_runner(|r| r.world_height()).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed_runner() {
        let mut runner = PlinkoRunner::new(EngineConfig::default().with_seed(3));
        runner.init().unwrap();
        RUNNER.with(|cell| *cell.borrow_mut() = Some(runner));
    }

    #[test]
    fn uninitialized_calls_are_ignored() {
        RUNNER.with(|cell| *cell.borrow_mut() = None);
        assert!(with_runner(|r| r.ball_count()).is_none());
        assert_eq!(get_ball_count(), 0);
        assert!(get_balls_ptr().is_null());
        assert!(!plinko_configure(8, 0));
        assert!(!plinko_drop_ball());
    }

    #[test]
    fn reentrant_call_is_dropped() {
        seed_runner();
        let inner = with_runner(|_| with_runner(|r| r.ball_count()));
        assert_eq!(inner, Some(None));
        // The runner is usable again afterwards
        assert_eq!(with_runner(|r| r.bucket_count()), Some(17));
    }

    #[test]
    fn configure_while_busy_reports_failure() {
        seed_runner();
        let inner = with_runner(|_| plinko_configure(8, 1));
        assert_eq!(inner, Some(false));
        assert_eq!(get_bucket_count(), 17);
    }

    #[test]
    fn exported_betting_flow() {
        seed_runner();
        assert!(plinko_set_bet(2.0));
        assert!(!plinko_set_bet(-1.0));
        assert!(plinko_drop_ball());
        assert_eq!(get_balance(), 177.0);
        plinko_tick(1.0 / 60.0);
        assert_eq!(get_ball_count(), 1);
        assert!(!plinko_configure(8, 9));
        assert!(plinko_configure(8, 2));
        assert_eq!(get_bucket_count(), 9);
    }
}
