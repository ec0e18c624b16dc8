use nalgebra::DMatrix;
use npyz::{DType, NpyFile, Order};
use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use super::{Image, ImageError, Result};

pub fn load(path: &Path) -> Result<Image> {
    let file = File::open(path).map_err(|e| ImageError::Io(e, path.to_path_buf()))?;
    read(BufReader::new(file))
}

fn samples<T, R, F>(npy: NpyFile<R>, to_f64: F) -> Result<Vec<f64>>
where
    T: npyz::Deserialize,
    R: Read,
    F: Fn(T) -> f64,
{
    Ok(npy
        .into_vec::<T>()
        .map_err(ImageError::Npy)?
        .into_iter()
        .map(to_f64)
        .collect())
}

/// Decodes a 2D numpy array
pub fn read<R: Read>(reader: R) -> Result<Image> {
    let npy = NpyFile::new(reader).map_err(ImageError::Npy)?;
    let (rows, cols) = match npy.shape() {
        &[rows, cols] => (rows as usize, cols as usize),
        shape => return Err(ImageError::Dimensions(shape.len())),
    };
    let order = npy.order();
    let type_str = match npy.dtype() {
        DType::Plain(type_str) => type_str.to_string(),
        dtype => return Err(ImageError::DataType(format!("{dtype:?}"))),
    };
    // the first character is the byte order
    let data = match type_str.get(1..).unwrap_or_default() {
        "f8" => samples(npy, |x: f64| x)?,
        "f4" => samples(npy, |x: f32| x as f64)?,
        "i1" => samples(npy, |x: i8| x as f64)?,
        "i2" => samples(npy, |x: i16| x as f64)?,
        "i4" => samples(npy, |x: i32| x as f64)?,
        "i8" => samples(npy, |x: i64| x as f64)?,
        "u1" => samples(npy, |x: u8| x as f64)?,
        "u2" => samples(npy, |x: u16| x as f64)?,
        "u4" => samples(npy, |x: u32| x as f64)?,
        "u8" => samples(npy, |x: u64| x as f64)?,
        _ => return Err(ImageError::DataType(type_str.clone())),
    };
    match order {
        Order::C => Image::from_row_major(rows, cols, data),
        Order::Fortran => {
            if data.len() != rows * cols {
                return Err(ImageError::SampleCount {
                    rows,
                    cols,
                    expected: rows * cols,
                    found: data.len(),
                });
            }
            Ok(DMatrix::from_vec(rows, cols, data).into())
        }
    }
}
