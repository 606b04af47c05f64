use super::*;

#[test]
fn delay_is_hundredths_of_a_second() {
    let t = Timing::new(60).unwrap();
    assert_eq!(t.delay_to_ms(0), 0);
    assert_eq!(t.delay_to_ms(1), 10);
    assert_eq!(t.delay_to_ms(100), 1000);
}

#[test]
fn delay_frames_match_floor_formula() {
    for rate in [24u32, 30, 60] {
        let t = Timing::new(rate).unwrap();
        for d in 0u32..200 {
            let expect = u64::from(d) * 10 * u64::from(rate) / 1000;
            assert_eq!(t.ms_to_frames(t.delay_to_ms(d)), expect, "rate {rate} delay {d}");
        }
    }
}

#[test]
fn delay_frames_monotonic_non_decreasing() {
    let t = Timing::new(60).unwrap();
    let mut prev = 0;
    for d in 0u32..500 {
        let frames = t.ms_to_frames(t.delay_to_ms(d));
        assert!(frames >= prev);
        prev = frames;
    }
}

#[test]
fn sub_frame_delay_yields_zero_frames() {
    let t = Timing::new(60).unwrap();
    // One hundredth of a second is shorter than one 60 fps frame.
    assert_eq!(t.ms_to_frames(t.delay_to_ms(1)), 0);
}

#[test]
fn fade_speed_endpoints() {
    let t = Timing::new(60).unwrap();
    assert_eq!(t.speed_to_ms(0), SLOWEST_FADE_MS);
    assert_eq!(t.speed_to_ms(MAX_FADE_SPEED), 0);
    assert_eq!(t.speed_to_ms(MAX_FADE_SPEED + 500), 0);
}

#[test]
fn fade_speed_monotonic_non_increasing() {
    let t = Timing::new(60).unwrap();
    let mut prev = u64::MAX;
    for s in 0..=MAX_FADE_SPEED {
        let ms = t.speed_to_ms(s);
        assert!(ms <= prev);
        prev = ms;
    }
}

#[test]
fn render_speed_scales_durations() {
    let double = Timing::with_speed(60, 200).unwrap();
    assert_eq!(double.delay_to_ms(10), 50);
    assert_eq!(double.speed_to_ms(0), SLOWEST_FADE_MS / 2);

    let half = Timing::with_speed(60, 50).unwrap();
    assert_eq!(half.delay_to_ms(10), 200);
}

#[test]
fn zero_rate_and_zero_speed_are_rejected() {
    assert!(Timing::new(0).is_err());
    assert!(Timing::with_speed(60, 0).is_err());
}
