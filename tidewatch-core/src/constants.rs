pub const TICK_MS: u64 = 50;
pub const INPUT_SUBSTEP_MS: u64 = 10;

pub const HOTBAR_SLOTS: usize = 9;

pub const PITCH_MIN: f64 = -90.0;
pub const PITCH_MAX: f64 = 90.0;
pub const ROTATION_SPEED_MIN: f64 = 0.1;
pub const ROTATION_SPEED_MAX: f64 = 1.0;
pub const DEGENERATE_HORIZONTAL: f64 = 0.1;

pub const CLUSTER_THRESHOLD_MIN: u32 = 1;
pub const CLUSTER_THRESHOLD_MAX: u32 = 30;

pub const HOLD_MIN_MS: u64 = 10;
pub const HOLD_MAX_MS: u64 = 30;

pub const MARKER_RADIUS: f64 = 15.0;
pub const PROXY_MARGIN_HORIZONTAL: f64 = 0.3;
pub const PROXY_MARGIN_VERTICAL: f64 = 2.0;
pub const WIDE_MARGIN_HORIZONTAL: f64 = 0.5;
pub const WIDE_MARGIN_VERTICAL: f64 = 3.0;

pub const MAGE_COOLDOWN_MS: u64 = 350;
pub const MELEE_COOLDOWN_MS: u64 = 334;
pub const BURST_COOLDOWN_MS: u64 = 1_000;
pub const LOOK_DOWN_PITCH: f64 = 90.0;
pub const MELEE_ROTATION_SPEED: f64 = 0.3;

pub const BITE_LABEL: &str = "!!!";
pub const BITE_RADIUS: f64 = 50.0;
pub const BITE_DEBOUNCE_MS: u64 = 50;
pub const CAST_SETTLE_TICKS: u32 = 10;
pub const POST_REEL_MIN_TICKS: u32 = 30;

pub const COMBAT_DETECTION_RADIUS: f64 = 6.0;
pub const COMBAT_RECOVER_MS: u64 = 400;

pub const LASSO_RADIUS: f64 = 15.0;
pub const LASSO_ESCAPE_DISTANCE: f64 = 15.0;
pub const LASSO_TIMEOUT_MS: u64 = 5_000;
pub const LASSO_REEL_RADIUS: f64 = 3.0;
pub const LASSO_ROTATION_SPEED: f64 = 0.15;
pub const LASSO_CONVERGE_DEGREES: f64 = 1.0;

pub const ASSIST_RADIUS: f64 = 50.0;
pub const ASSIST_SCAN_MS: u64 = 1_000;
pub const ASSIST_DISTANCE: f64 = 9.0;

pub const FARMER_ATTACK_DISTANCE: f64 = 3.0;
pub const FARMER_STATUS_CHECK_MS: u64 = 200;
pub const FARMER_LOW_STATUS: f64 = 10_000.0;
pub const FARMER_FINISHER_WAIT_TICKS: u32 = 3;

pub const FLARE_RADIUS: f64 = 6.0;
pub const FLARE_ORB_INTERVAL_MS: u64 = 40_000;
pub const FLARE_CLICK_COUNT: u32 = 3;
