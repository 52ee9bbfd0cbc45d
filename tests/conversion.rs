use std::time::Duration;

use image::{DynamicImage, Rgba, RgbaImage};
use pixelboard::canvas::Cell;
use pixelboard::io::{decode_pixel_data, encode_pixel_data};
use pixelboard::ops::convert::{ConversionQueue, ConvertOptions, convert_image, convert_image_bytes};
use pixelboard::ops::render::{RenderOptions, encode_png, render, render_value};
use pixelboard::{BoardError, EditingSession, Rgb};
use serde_json::{Value, json};

fn png(img: &RgbaImage) -> Vec<u8> {
    encode_png(img).unwrap()
}

/// Left half red, right half blue, bottom quarter fully transparent.
fn split_image() -> RgbaImage {
    RgbaImage::from_fn(320, 320, |x, y| {
        if y >= 240 {
            Rgba([0, 0, 0, 0])
        } else if x < 160 {
            Rgba([255, 0, 0, 255])
        } else {
            Rgba([0, 0, 255, 255])
        }
    })
}

#[test]
fn converts_png_bytes_into_grid() {
    let conv = convert_image_bytes(&png(&split_image()), &ConvertOptions::default()).unwrap();

    assert_eq!(conv.grid.get(Cell::new(0, 0)), Some(Rgb::new(255, 0, 0)));
    assert_eq!(conv.grid.get(Cell::new(504, 0)), Some(Rgb::new(0, 0, 255)));
    // transparent rows produce no cells
    assert_eq!(conv.grid.get(Cell::new(0, 504)), None);
    assert!(conv.grid.iter().all(|(c, _)| c.x % 8 == 0 && c.y % 8 == 0));
    assert!(conv.grid.iter().all(|(c, _)| c.y < 400));
}

#[test]
fn preview_matches_grid() {
    let conv = convert_image_bytes(&png(&split_image()), &ConvertOptions::default()).unwrap();
    assert_eq!(conv.preview.dimensions(), (512, 512));
    for (cell, color) in conv.grid.iter() {
        assert_eq!(*conv.preview.get_pixel(cell.x + 3, cell.y + 5), color.to_rgba());
    }
    let bytes = conv.preview_png().unwrap();
    assert_eq!(&bytes[1..4], b"PNG");
}

#[test]
fn same_input_same_grid() {
    let img = RgbaImage::from_fn(211, 143, |x, y| {
        Rgba([(x % 256) as u8, (y * 3 % 256) as u8, ((x + y) % 256) as u8, 255])
    });
    let opts = ConvertOptions::default();
    let a = convert_image(&DynamicImage::ImageRgba8(img.clone()), &opts).unwrap();
    let b = convert_image(&DynamicImage::ImageRgba8(img), &opts).unwrap();
    assert_eq!(a.grid, b.grid);
    assert_eq!(a.preview, b.preview);
}

#[test]
fn corrupt_input_is_an_error() {
    let mut bytes = png(&split_image());
    bytes.truncate(40);
    let err = convert_image_bytes(&bytes, &ConvertOptions::default()).unwrap_err();
    assert!(matches!(err, BoardError::Decode(_)));
}

#[test]
fn failed_conversion_leaves_session_untouched() {
    let mut session = EditingSession::new();
    session.set_color(Rgb::new(1, 2, 3));
    session.pointer_down(Default::default(), pixelboard::session::PointerButton::Primary);
    session.pointer_up(pixelboard::session::PointerButton::Primary);
    let before = session.grid().clone();

    if let Ok(conv) = convert_image_bytes(b"garbage", &ConvertOptions::default()) {
        session.import_grid(conv.grid);
    }
    assert_eq!(session.grid(), &before);
}

#[test]
fn queue_delivers_latest_conversion() {
    let mut queue = ConversionQueue::new(ConvertOptions::default());
    queue.submit(png(&RgbaImage::from_pixel(50, 50, Rgba([9, 9, 9, 255]))));
    queue.submit(png(&split_image()));
    let conv = queue.wait(Duration::from_secs(30)).unwrap().unwrap();
    assert_eq!(conv.grid.get(Cell::new(0, 0)), Some(Rgb::new(255, 0, 0)));
    assert!(queue.poll().is_none());
}

#[test]
fn renderer_survives_bad_payloads() {
    let opts = RenderOptions::default();
    for payload in [None, Some(Value::Null), Some(json!({})), Some(json!({"bad key": "notacolor"}))] {
        let img = render_value(payload.as_ref(), &opts);
        assert!(img.width() >= 1 && img.height() >= 1);
    }
}

#[test]
fn rendered_thumbnail_matches_converted_grid() {
    let conv = convert_image_bytes(&png(&split_image()), &ConvertOptions::default()).unwrap();
    let wire = encode_pixel_data(&conv.grid).unwrap();

    let from_wire = render_value(Some(&Value::String(wire.clone())), &RenderOptions::default());
    let typed = render(&decode_pixel_data(&Value::String(wire)), &RenderOptions::default());
    assert_eq!(from_wire, typed);
    assert_eq!(*typed.get_pixel(0, 0), Rgba([255, 0, 0, 255]));
    assert_eq!(*typed.get_pixel(0, 63), Rgba([0, 0, 0, 255]));
}
