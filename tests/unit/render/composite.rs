use std::sync::Arc;

use super::*;

fn solid(w: u32, h: u32, px: [u8; 4]) -> PreparedFrame {
    PreparedFrame {
        width: w,
        height: h,
        rgba8_premul: Arc::new(px.repeat((w * h) as usize)),
    }
}

#[test]
fn over_opacity_0_is_noop() {
    let dst = [1, 2, 3, 4];
    let src = [200, 200, 200, 200];
    assert_eq!(over(dst, src, 0.0), dst);
}

#[test]
fn over_src_alpha_0_is_noop() {
    let dst = [10, 20, 30, 40];
    let src = [255, 255, 255, 0];
    assert_eq!(over(dst, src, 1.0), dst);
}

#[test]
fn over_src_opaque_replaces_dst() {
    let dst = [0, 0, 0, 255];
    let src = [255, 0, 0, 255];
    assert_eq!(over(dst, src, 1.0), src);
}

#[test]
fn over_partial_opacity_cross_dissolves_opaque_pixels() {
    let a = [200, 0, 0, 255];
    let b = [0, 0, 200, 255];
    let out = over(a, b, 0.25);
    assert_eq!(out[3], 255);
    assert!((i32::from(out[0]) - 150).abs() <= 1);
    assert!((i32::from(out[2]) - 50).abs() <= 1);
}

#[test]
fn same_size_draw_is_exact_copy() {
    let mut surface = Surface::new(3, 2).unwrap();
    let mut frame = solid(3, 2, [0, 0, 0, 255]);
    let mut px = frame.rgba8_premul.as_ref().clone();
    px[4..8].copy_from_slice(&[10, 20, 30, 255]);
    frame.rgba8_premul = Arc::new(px.clone());

    draw_frame(&mut surface, &frame, Rect::new(0.0, 0.0, 3.0, 2.0), 1.0);
    assert_eq!(surface.data(), px.as_slice());
}

#[test]
fn upscaled_solid_frame_fills_dest_only() {
    let mut surface = Surface::new(8, 4).unwrap();
    let frame = solid(2, 2, [90, 60, 30, 255]);

    draw_frame(&mut surface, &frame, Rect::new(2.0, 0.0, 6.0, 4.0), 1.0);
    assert_eq!(surface.pixel(0, 0), Some([0, 0, 0, 0]));
    assert_eq!(surface.pixel(1, 3), Some([0, 0, 0, 0]));
    assert_eq!(surface.pixel(2, 0), Some([90, 60, 30, 255]));
    assert_eq!(surface.pixel(5, 3), Some([90, 60, 30, 255]));
    assert_eq!(surface.pixel(6, 2), Some([0, 0, 0, 0]));
}

#[test]
fn dest_outside_surface_is_clipped() {
    let mut surface = Surface::new(2, 2).unwrap();
    let frame = solid(1, 1, [255, 255, 255, 255]);
    draw_frame(&mut surface, &frame, Rect::new(-10.0, -10.0, -1.0, -1.0), 1.0);
    draw_frame(&mut surface, &frame, Rect::new(1.0, 1.0, 40.0, 40.0), 1.0);
    assert_eq!(surface.pixel(0, 0), Some([0, 0, 0, 0]));
    assert_eq!(surface.pixel(1, 1), Some([255, 255, 255, 255]));
}

#[test]
fn bilinear_keeps_premul_invariant() {
    let frame = PreparedFrame {
        width: 2,
        height: 1,
        rgba8_premul: Arc::new(vec![255, 255, 255, 255, 0, 0, 0, 0]),
    };
    let mut surface = Surface::new(7, 1).unwrap();
    draw_frame(&mut surface, &frame, Rect::new(0.0, 0.0, 7.0, 1.0), 1.0);
    for px in surface.data().chunks_exact(4) {
        assert!(px[0] <= px[3] && px[1] <= px[3] && px[2] <= px[3]);
    }
}
