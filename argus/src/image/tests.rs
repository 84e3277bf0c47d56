use crate::prelude::*;

// =============================================================================
// Descriptor tests
// =============================================================================

#[test]
fn desc_aligns_stride() {
    let desc = ImageDesc::new(5, 4, ColorFormat::RGB_U8);
    assert_eq!(desc.row_bytes(), 15);
    assert_eq!(desc.stride, 16); // 15 aligned to 4
    assert!(!desc.is_packed());
    assert!(desc.is_aligned());
    assert_eq!(desc.size_in_bytes(), 64);
}

#[test]
fn desc_already_aligned_formats_are_packed() {
    let desc = ImageDesc::new(7, 3, ColorFormat::GRAY_F32);
    assert_eq!(desc.stride, 28);
    assert!(desc.is_packed());

    let desc = ImageDesc::new(4, 4, ColorFormat::RGB_U8);
    assert_eq!(desc.stride, 12);
    assert!(desc.is_packed());
}

#[test]
fn desc_transposed_swaps_dimensions() {
    let desc = ImageDesc::new(64, 48, ColorFormat::GRAY_F32);
    let t = desc.transposed();
    assert_eq!(t.width, 48);
    assert_eq!(t.height, 64);
    assert_eq!(t.color_format, desc.color_format);
    assert_eq!(t.stride, 48 * 4);
}

#[test]
fn desc_display() {
    let desc = ImageDesc::new(64, 48, ColorFormat::RGB_U8);
    assert_eq!(desc.to_string(), "64x48 RGB u8");
}

// =============================================================================
// Image construction tests
// =============================================================================

#[test]
fn new_empty_is_zeroed() {
    let desc = ImageDesc::new(3, 2, ColorFormat::RGB_U8);
    let img = Image::new_empty(desc).unwrap();
    assert_eq!(img.bytes().len(), desc.size_in_bytes());
    assert!(img.bytes().iter().all(|b| *b == 0));
}

#[test]
fn new_with_data_rejects_wrong_length() {
    let desc = ImageDesc::new(3, 2, ColorFormat::RGB_U8);
    let result = Image::new_with_data(desc, vec![0; 5]);
    assert!(matches!(result, Err(Error::InvalidColorFormat(_))));
}

#[test]
fn new_empty_rejects_unsupported_format() {
    let desc = ImageDesc {
        width: 2,
        height: 2,
        stride: 8,
        color_format: ColorFormat {
            channel_count: ChannelCount::Rgba,
            channel_size: ChannelSize::_8bit,
            channel_type: ChannelType::UInt,
        },
    };
    assert!(Image::new_empty(desc).is_err());
}

// =============================================================================
// Stride conversion tests
// =============================================================================

#[test]
fn packed_strips_padding() {
    let desc = ImageDesc::new(5, 2, ColorFormat::RGB_U8);
    let mut img = Image::new_empty(desc).unwrap();
    for (i, byte) in img.bytes_mut().iter_mut().enumerate() {
        *byte = i as u8;
    }

    let packed = img.clone().packed();
    assert!(packed.desc().is_packed());
    assert_eq!(packed.desc().stride, 15);
    // First row survives byte-for-byte, second row follows without the pad
    assert_eq!(&packed.bytes()[..15], &img.bytes()[..15]);
    assert_eq!(&packed.bytes()[15..30], &img.bytes()[16..31]);
}

#[test]
fn with_stride_round_trips() {
    let desc = ImageDesc::new(5, 3, ColorFormat::RGB_U8);
    let mut img = Image::new_empty(desc).unwrap();
    for (i, byte) in img.bytes_mut().iter_mut().enumerate() {
        *byte = (i * 7 % 256) as u8;
    }

    let round_tripped = img.clone().packed().with_stride();
    assert_eq!(round_tripped.desc(), img.desc());
    assert!(pixels_equal(&round_tripped, &img));
}

#[test]
fn with_stride_is_noop_when_aligned() {
    let desc = ImageDesc::new(4, 2, ColorFormat::GRAY_F32);
    let img = Image::new_empty(desc).unwrap();
    let same = img.clone().with_stride();
    assert_eq!(same.desc(), img.desc());
}
