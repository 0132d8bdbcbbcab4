use background_remover::removal::filters::{sobel, to_grayscale};
use background_remover::removal::matcher::match_and_clear;
use background_remover::removal::resize::target_dimensions;
use background_remover::removal::sampler::estimate;
use background_remover::removal::{
    Color, ImageSurface, MediaType, PixelBuffer, RasterSurface, SampleSet,
};
use proptest::prelude::*;

fn opaque_buffer() -> impl Strategy<Value = PixelBuffer> {
    (1u32..12, 1u32..12).prop_flat_map(|(w, h)| {
        proptest::collection::vec(any::<[u8; 3]>(), (w * h) as usize).prop_map(move |pixels| {
            PixelBuffer::from_fn(w, h, |x, y| {
                let [r, g, b] = pixels[(y * w + x) as usize];
                Color::rgb(r, g, b)
            })
        })
    })
}

fn any_buffer() -> impl Strategy<Value = PixelBuffer> {
    (1u32..10, 1u32..10).prop_flat_map(|(w, h)| {
        proptest::collection::vec(any::<u8>(), (w * h * 4) as usize)
            .prop_map(move |data| PixelBuffer::new(w, h, data).expect("layout matches"))
    })
}

proptest! {
    #[test]
    fn single_corner_sample_returns_that_pixel(buffer in opaque_buffer(), corner in 0usize..4) {
        let (w, h) = buffer.dimensions();
        let (x, y) = [(0, 0), (w - 1, 0), (0, h - 1), (w - 1, h - 1)][corner];

        let estimated = estimate(&buffer, &SampleSet::new(vec![(x as i64, y as i64)]));
        let expected = buffer.pixel(x, y).expect("corner in range");
        prop_assert_eq!(estimated, Color::rgb(expected.r, expected.g, expected.b));
    }

    #[test]
    fn matching_clears_exactly_the_close_pixels(
        buffer in opaque_buffer(),
        target in any::<[u8; 3]>(),
        tolerance in 0.0f64..120.0,
    ) {
        let target = Color::rgb(target[0], target[1], target[2]);
        let before = buffer.clone();
        let mut after = buffer;

        match_and_clear(&mut after, target, tolerance, |_| {}).expect("match failed");

        for (old, new) in before.data().chunks_exact(4).zip(after.data().chunks_exact(4)) {
            prop_assert_eq!(&old[..3], &new[..3]);
            let close = Color::rgb(old[0], old[1], old[2]).distance(&target) < tolerance;
            prop_assert_eq!(new[3] == 0, close);
        }
    }

    #[test]
    fn pixel_exactly_at_tolerance_is_kept(rgb in any::<[u8; 3]>()) {
        let pixel = Color::rgb(rgb[0], rgb[1], rgb[2]);
        let target = Color::rgb(0, 0, 0);
        let tolerance = pixel.distance(&target);

        let mut buffer = PixelBuffer::filled(1, 1, pixel);
        match_and_clear(&mut buffer, target, tolerance, |_| {}).expect("match failed");
        prop_assert_eq!(buffer.pixel(0, 0).map(|c| c.a), Some(255));
    }

    #[test]
    fn grayscale_is_idempotent(buffer in any_buffer()) {
        let mut once = buffer;
        to_grayscale(&mut once);
        let mut twice = once.clone();
        to_grayscale(&mut twice);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn resize_respects_bound_and_aspect(
        w in 1u32..10_000,
        h in 1u32..10_000,
        max_side in 1u32..4096,
    ) {
        match target_dimensions(w, h, max_side) {
            None => prop_assert!(w <= max_side && h <= max_side),
            Some((tw, th)) => {
                prop_assert!(tw <= max_side && th <= max_side);
                prop_assert!(tw >= 1 && th >= 1);
                prop_assert_eq!(tw.max(th), max_side);
                if w >= h {
                    let ideal = h as f64 * max_side as f64 / w as f64;
                    prop_assert!((th as f64 - ideal).abs() <= 1.0);
                } else {
                    let ideal = w as f64 * max_side as f64 / h as f64;
                    prop_assert!((tw as f64 - ideal).abs() <= 1.0);
                }
            }
        }
    }

    #[test]
    fn sobel_of_uniform_buffer_is_opaque_black(
        w in 1u32..16,
        h in 1u32..16,
        rgba in any::<[u8; 4]>(),
    ) {
        let source = PixelBuffer::filled(w, h, Color::rgba(rgba[0], rgba[1], rgba[2], rgba[3]));
        let edges = sobel(&source);
        prop_assert_eq!(edges.dimensions(), (w, h));
        prop_assert!(edges.data().chunks_exact(4).all(|px| px == [0, 0, 0, 255]));
    }

    #[test]
    fn png_roundtrip_preserves_pixels(buffer in any_buffer()) {
        let bytes = ImageSurface.encode(&buffer, MediaType::Png, 1.0).expect("encode failed");
        let decoded = ImageSurface.decode(&bytes).expect("decode failed");
        prop_assert_eq!(decoded, buffer);
    }
}
