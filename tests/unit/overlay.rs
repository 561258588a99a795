use super::*;

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn value_of(frame: &OverlayFrame, element: &str, property: OverlayProperty) -> Option<f64> {
    frame
        .updates
        .iter()
        .find(|u| u.element == element && u.property == property)
        .map(|u| u.value)
}

#[test]
fn interval_map_interpolates_and_clamps() {
    let m = IntervalMap::new(vec![0.0, 0.12, 0.22], vec![1.0, 1.0, 0.0]).unwrap();
    assert_eq!(m.eval(-1.0), 1.0);
    assert_eq!(m.eval(0.05), 1.0);
    assert!(approx(m.eval(0.17), 0.5));
    assert_eq!(m.eval(0.22), 0.0);
    assert_eq!(m.eval(0.9), 0.0);
    assert_eq!(m.eval(f64::NAN), 1.0);
}

#[test]
fn interval_map_hits_interior_stops_exactly() {
    let m = IntervalMap::new(vec![0.18, 0.28, 0.42, 0.52], vec![-30.0, 0.0, 0.0, -30.0]).unwrap();
    assert_eq!(m.eval(0.28), 0.0);
    assert_eq!(m.eval(0.42), 0.0);
    assert!(approx(m.eval(0.47), -15.0));
}

#[test]
fn interval_map_rejects_bad_stops() {
    assert!(IntervalMap::new(vec![0.0], vec![1.0]).is_err());
    assert!(IntervalMap::new(vec![0.0, 1.0], vec![1.0]).is_err());
    assert!(IntervalMap::new(vec![0.5, 0.2], vec![0.0, 1.0]).is_err());
    assert!(IntervalMap::new(vec![0.0, f64::INFINITY], vec![0.0, 1.0]).is_err());
}

#[test]
fn first_map_publishes_every_channel_and_header() {
    let cfg = OverlayConfig::default();
    let channel_count: usize = cfg.elements.iter().map(|e| e.channels.len()).sum();
    let mut m = OverlayMapper::new(cfg);

    let frame = m.map(0.0);
    assert_eq!(frame.updates.len(), channel_count);
    assert_eq!(value_of(&frame, "intro", OverlayProperty::Opacity), Some(1.0));
    assert_eq!(value_of(&frame, "cta", OverlayProperty::Scale), Some(0.95));
    assert_eq!(
        frame.header,
        Some(HeaderSignal {
            opacity: 0.0,
            pointer_events: false
        })
    );
}

#[test]
fn sub_threshold_motion_is_suppressed() {
    let mut m = OverlayMapper::new(OverlayConfig::default());
    m.map(0.0);
    // intro translateY moves by ~0.02px here.
    assert!(m.map(0.0001).is_empty());
}

#[test]
fn fades_settle_exactly_on_their_end_stop() {
    let mut m = OverlayMapper::new(OverlayConfig::default());
    m.map(0.0);

    let f = m.map(0.2195);
    let near_zero = value_of(&f, "intro", OverlayProperty::Opacity).unwrap();
    assert!((near_zero - 0.005).abs() < 1e-6);

    // 0.001 is below the opacity threshold and not a stop value.
    let f = m.map(0.2199);
    assert_eq!(value_of(&f, "intro", OverlayProperty::Opacity), None);

    // 0.0 is a stop value, so it is published despite the small delta.
    let f = m.map(0.25);
    assert_eq!(value_of(&f, "intro", OverlayProperty::Opacity), Some(0.0));
}

#[test]
fn story_panels_fade_in_then_out() {
    let m = OverlayMapper::new(OverlayConfig::default());
    let get = |p: f64, id: &str| {
        m.snapshot(p)
            .into_iter()
            .find(|u| u.element == id && u.property == OverlayProperty::Opacity)
            .map(|u| u.value)
            .unwrap()
    };
    assert_eq!(get(0.10, "story1"), 0.0);
    assert_eq!(get(0.35, "story1"), 1.0);
    assert_eq!(get(0.60, "story1"), 0.0);
    assert_eq!(get(0.65, "story2"), 1.0);
    assert_eq!(get(0.95, "cta"), 1.0);
}

#[test]
fn header_pointer_events_follow_opacity() {
    let mut m = OverlayMapper::new(OverlayConfig::default());
    m.map(0.5);

    let h = m.map(0.9).header.unwrap();
    assert!(!h.pointer_events);
    assert!((h.opacity - 1.0 / 3.0).abs() < 1e-9);

    let h = m.map(0.95).header.unwrap();
    assert!(h.pointer_events);

    let h = m.map(1.0).header.unwrap();
    assert_eq!(h.opacity, 1.0);

    // Scrolling back to the top hides it again.
    let h = m.map(0.1).header.unwrap();
    assert_eq!(
        h,
        HeaderSignal {
            opacity: 0.0,
            pointer_events: false
        }
    );
}

#[test]
fn reset_forces_republish() {
    let mut m = OverlayMapper::new(OverlayConfig::default());
    m.map(0.3);
    assert!(m.map(0.3).is_empty());
    m.reset();
    assert!(!m.map(0.3).is_empty());
}

#[test]
fn config_validation_catches_duplicates_and_bad_maps() {
    assert!(OverlayConfig::default().validate().is_ok());

    let mut dup = OverlayConfig::default();
    dup.elements[1].id = "intro".to_string();
    assert!(dup.validate().is_err());

    let mut bad = OverlayConfig::default();
    bad.elements[0].channels[0].map.output.pop();
    assert!(bad.validate().is_err());
}

#[test]
fn config_round_trips_through_json() {
    let cfg = OverlayConfig::default();
    let s = serde_json::to_string(&cfg).unwrap();
    assert!(s.contains("\"translate_y\""));
    let back: OverlayConfig = serde_json::from_str(&s).unwrap();
    assert_eq!(back, cfg);
}
