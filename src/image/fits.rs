use fitsio::{hdu::HduInfo, FitsFile};
use std::path::Path;

use super::{Image, ImageError, ImageHeader, Result};

/// Loads the first HDU holding a non-empty 2D image
///
/// The plate id and observation date are read from the primary header.
/// The first FITS row becomes the first image row, no flip is applied.
pub fn load(path: &Path) -> Result<Image> {
    let mut fptr = FitsFile::open(path)?;

    let primary = fptr.primary_hdu()?;
    let header = ImageHeader {
        plate_id: primary.read_key::<i64>(&mut fptr, "PLATEID").ok(),
        date_obs: primary.read_key::<String>(&mut fptr, "DATE-OBS").ok(),
    };

    let mut hdu_idx = 0usize;
    while let Ok(hdu) = fptr.hdu(hdu_idx) {
        let is_image = match &hdu.info {
            HduInfo::ImageInfo { shape, .. } => {
                shape.len() == 2 && shape.iter().product::<usize>() > 0
            }
            _ => false,
        };
        if is_image {
            let naxis1 = hdu.read_key::<i64>(&mut fptr, "NAXIS1")? as usize;
            let naxis2 = hdu.read_key::<i64>(&mut fptr, "NAXIS2")? as usize;
            let samples: Vec<f64> = hdu.read_image(&mut fptr)?;
            log::debug!("{:?}: HDU #{} is a {}x{} image", path, hdu_idx, naxis2, naxis1);
            return Ok(Image::from_row_major(naxis2, naxis1, samples)?.with_header(header));
        }
        hdu_idx += 1;
    }
    Err(ImageError::NoImageHdu(path.to_path_buf()))
}
