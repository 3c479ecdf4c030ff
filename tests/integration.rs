#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;

/// 菜单程序，使用模拟传感器且不带ThingSpeak密钥
fn hub() -> Command {
    let mut cmd = Command::cargo_bin("smart-temp-hub").unwrap();
    cmd.env("SENSOR", "ramp")
        .env("RUST_LOG", "warn")
        .env_remove("THINGSPEAK_CHANNEL_ID")
        .env_remove("THINGSPEAK_WRITE_API_KEY")
        .env_remove("THINGSPEAK_USER_API_KEY")
        .env_remove("THINGSPEAK_BASE_URL")
        .env_remove("LED_RED_PIN")
        .env_remove("LED_GREEN_PIN")
        .env_remove("LED_BLUE_PIN")
        .env_remove("TEMP_LIMIT")
        .env_remove("LED_BELOW_LIMIT")
        .env_remove("LED_ABOVE_LIMIT");
    cmd
}

// ---------------------------------------------------------------------------
// 菜单
// ---------------------------------------------------------------------------

#[test]
fn exit_choice_quits_cleanly() {
    hub().write_stdin("6\n").assert().success().stdout(
        predicate::str::contains("--- SmartTempHub Main Menu ---")
            .and(predicate::str::contains("5. Start system (Sensor + LED + ThingSpeak)"))
            .and(predicate::str::contains("👋 Exiting...")),
    );
}

#[test]
fn closed_stdin_quits_cleanly() {
    hub()
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::contains("👋 Exiting..."));
}

#[test]
fn unknown_choice_is_rejected() {
    hub()
        .write_stdin("abc\n6\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("unknown choice 'abc'"));
}

// ---------------------------------------------------------------------------
// 配置
// ---------------------------------------------------------------------------

#[test]
fn threshold_edit_is_confirmed() {
    hub()
        .write_stdin("2\ngreen\nblue\n22.5\n6\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("✅ Set: <=22.5°C ➜ GREEN, >22.5°C ➜ BLUE"));
}

#[test]
fn threshold_defaults_come_from_env() {
    hub()
        .env("TEMP_LIMIT", "18")
        .env("LED_ABOVE_LIMIT", "green")
        .write_stdin("2\n\n\n\n6\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("✅ Set: <=18°C ➜ BLUE, >18°C ➜ GREEN"));
}

#[test]
fn pin_edit_rejects_out_of_range() {
    hub()
        .write_stdin("1\n40\n5\n\n\n6\n")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("GPIO 40 is out of range")
                .and(predicate::str::contains("✅ GPIO pins: red 5, green 16, blue 20")),
        );
}

#[test]
fn purge_without_user_key_is_skipped() {
    hub()
        .write_stdin("4\n-1\n5\n6\n")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("-1 minutes is negative")
                .and(predicate::str::contains("Delete skipped.")),
        );
}

#[test]
fn purge_blank_input_cancels() {
    hub()
        .write_stdin("3\n2974228\n\n\n4\n\n6\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Cancelled."));
}
