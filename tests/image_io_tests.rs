// File collaborators around the codec.
#![cfg(feature = "image")]

use nblic::{compress, decompress, load_image, save_image, GrayImage, NblicError};
use tempfile::TempDir;

fn sample(width: usize, height: usize) -> GrayImage {
    let pixels = (0..width * height)
        .map(|i| ((i % width) * 7 + (i / width) * 13) as u8)
        .collect();
    GrayImage::new(width, height, pixels).unwrap()
}

#[test]
fn test_pgm_and_bmp_roundtrip() {
    let dir = TempDir::new().unwrap();
    let img = sample(13, 9);
    for name in ["out.pgm", "out.bmp", "out.BMP", "out"] {
        let path = dir.path().join(name);
        save_image(&path, &img).unwrap();
        assert_eq!(load_image(&path).unwrap(), img, "{name}");
    }
}

#[test]
fn test_format_follows_extension() {
    let dir = TempDir::new().unwrap();
    let img = sample(5, 4);
    let pgm = dir.path().join("a.pgm");
    let bmp = dir.path().join("a.bmp");
    save_image(&pgm, &img).unwrap();
    save_image(&bmp, &img).unwrap();
    assert!(nblic::read_bytes(&pgm).unwrap().starts_with(b"P5"));
    assert!(nblic::read_bytes(&bmp).unwrap().starts_with(b"BM"));
}

#[test]
fn test_format_sniffed_from_contents() {
    let dir = TempDir::new().unwrap();
    let img = sample(6, 6);
    let bmp = dir.path().join("real.bmp");
    save_image(&bmp, &img).unwrap();
    let misnamed = dir.path().join("real.pgm");
    std::fs::rename(&bmp, &misnamed).unwrap();
    assert_eq!(load_image(&misnamed).unwrap(), img);
}

#[test]
fn test_color_input_becomes_luminance() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("gray.ppm");
    let rgb = image::RgbImage::from_pixel(3, 2, image::Rgb([90, 90, 90]));
    rgb.save(&path).unwrap();
    let img = load_image(&path).unwrap();
    assert_eq!((img.width(), img.height()), (3, 2));
    assert!(img.pixels().iter().all(|&v| v == 90));
}

#[test]
fn test_file_to_file_roundtrip() {
    let dir = TempDir::new().unwrap();
    let img = sample(20, 17);
    let src = dir.path().join("src.pgm");
    save_image(&src, &img).unwrap();

    let loaded = load_image(&src).unwrap();
    let packed = compress(loaded.pixels(), loaded.height(), loaded.width(), 0, 2).unwrap();
    let stream = dir.path().join("img.nblic");
    nblic::write_bytes(&stream, &packed).unwrap();

    let decoded = decompress(&nblic::read_bytes(&stream).unwrap()).unwrap();
    let restored = GrayImage::new(decoded.width, decoded.height, decoded.pixels).unwrap();
    let dst = dir.path().join("dst.bmp");
    save_image(&dst, &restored).unwrap();
    assert_eq!(load_image(&dst).unwrap(), img);
}

#[test]
fn test_huge_bmp_info_header_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.bmp");
    let mut data = Vec::new();
    data.extend_from_slice(b"BM");
    data.extend_from_slice(&54u32.to_le_bytes());
    data.extend_from_slice(&0u32.to_le_bytes());
    data.extend_from_slice(&1078u32.to_le_bytes());
    data.extend_from_slice(&0xFFFF_FFF8u32.to_le_bytes());
    data.extend_from_slice(&[0u8; 36]);
    std::fs::write(&path, &data).unwrap();
    assert!(load_image(&path).is_err());
}

#[test]
fn test_unknown_format_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("junk.dat");
    std::fs::write(&path, b"not an image at all").unwrap();
    assert!(matches!(load_image(&path), Err(NblicError::Image(_))));
    assert!(matches!(
        load_image(dir.path().join("missing.pgm")),
        Err(NblicError::Io(_))
    ));
}
