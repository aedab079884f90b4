//! Image dimension probe for `.bmp`, `.tga` and `.png` headers.
use std::{fs::File, io::Read, path::Path};

use nom::{
    bytes::complete::{tag, take},
    combinator::verify,
    number::complete::{be_i32, le_i32, le_u16},
    sequence::{preceded, tuple},
    IResult as _IResult,
};

use crate::error::CommonError;

type IResult<'a, T> = _IResult<&'a [u8], T>;

const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];
const BITMAPINFOHEADER_SIZE: i32 = 40;
const HEADER_LEN: u64 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Bmp,
    Tga,
    Png,
}

impl ImageFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_string_lossy().to_lowercase();

        match extension.as_str() {
            "bmp" => Some(Self::Bmp),
            "tga" => Some(Self::Tga),
            "png" => Some(Self::Png),
            _ => None,
        }
    }
}

fn parse_bmp(i: &[u8]) -> IResult<(i64, i64)> {
    let (i, _) = tag(&b"BM"[..])(i)?;
    let (i, _) = take(12usize)(i)?;
    let (i, _) = verify(le_i32, |size: &i32| *size == BITMAPINFOHEADER_SIZE)(i)?;
    let (i, (width, height)) = tuple((le_i32, le_i32))(i)?;

    Ok((i, (width as i64, height as i64)))
}

fn parse_tga(i: &[u8]) -> IResult<(i64, i64)> {
    let (i, (width, height)) = preceded(take(12usize), tuple((le_u16, le_u16)))(i)?;

    Ok((i, (width as i64, height as i64)))
}

fn parse_png(i: &[u8]) -> IResult<(i64, i64)> {
    let (i, _) = tag(&PNG_SIGNATURE[..])(i)?;
    // IHDR length and chunk type
    let (i, _) = take(8usize)(i)?;
    let (i, (width, height)) = tuple((be_i32, be_i32))(i)?;

    Ok((i, (width as i64, height as i64)))
}

pub fn parse_dimensions(format: ImageFormat, bytes: &[u8]) -> Option<(i64, i64)> {
    let res = match format {
        ImageFormat::Bmp => parse_bmp(bytes),
        ImageFormat::Tga => parse_tga(bytes),
        ImageFormat::Png => parse_png(bytes),
    };

    res.ok().map(|(_, dimensions)| dimensions)
}

/// Width and height read from the image header.
pub fn dimensions(path: impl AsRef<Path>) -> Result<(i64, i64), CommonError> {
    let path = path.as_ref();

    let Some(format) = ImageFormat::from_path(path) else {
        return CommonError::UnsupportedImage {
            path: path.to_path_buf(),
        }
        .to_result();
    };

    let mut header = vec![];

    File::open(path)
        .and_then(|file| file.take(HEADER_LEN).read_to_end(&mut header))
        .map_err(|op_error| CommonError::IOError {
            source: op_error,
            path: path.to_path_buf(),
        })?;

    parse_dimensions(format, &header).ok_or_else(|| CommonError::ImageHeader {
        path: path.to_path_buf(),
    })
}

#[cfg(test)]
mod test {
    use super::*;

    fn bmp_header(width: i32, height: i32) -> Vec<u8> {
        let mut bytes = b"BM".to_vec();
        bytes.extend([0u8; 12]);
        bytes.extend(40i32.to_le_bytes());
        bytes.extend(width.to_le_bytes());
        bytes.extend(height.to_le_bytes());
        bytes
    }

    #[test]
    fn bmp() {
        assert_eq!(
            parse_dimensions(ImageFormat::Bmp, &bmp_header(256, 128)),
            Some((256, 128))
        );

        let mut core_header = bmp_header(256, 128);
        core_header[14] = 12;

        assert_eq!(parse_dimensions(ImageFormat::Bmp, &core_header), None);
    }

    #[test]
    fn tga() {
        let mut bytes = vec![0u8; 12];
        bytes.extend(512u16.to_le_bytes());
        bytes.extend(64u16.to_le_bytes());

        assert_eq!(parse_dimensions(ImageFormat::Tga, &bytes), Some((512, 64)));
    }

    #[test]
    fn png() {
        let mut bytes = PNG_SIGNATURE.to_vec();
        bytes.extend(13u32.to_be_bytes());
        bytes.extend(b"IHDR");
        bytes.extend(1024i32.to_be_bytes());
        bytes.extend(32i32.to_be_bytes());

        assert_eq!(parse_dimensions(ImageFormat::Png, &bytes), Some((1024, 32)));
        assert_eq!(parse_dimensions(ImageFormat::Png, &bytes[1..]), None);
    }

    #[test]
    fn probe_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Wall.BMP");
        std::fs::write(&path, bmp_header(64, 32)).unwrap();

        assert_eq!(dimensions(&path).unwrap(), (64, 32));
        assert!(matches!(
            dimensions(dir.path().join("wall.jpg")),
            Err(CommonError::UnsupportedImage { .. })
        ));
    }
}
