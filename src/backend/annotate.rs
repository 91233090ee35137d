// src/backend/annotate.rs
//
// Optional post-processing: draw pothole boxes onto a copy of the image and
// write it out. Runs after scoring and never feeds back into it.

use crate::types::{Detection, Frame};
use anyhow::{Context, Result};
use opencv::{core, imgcodecs, imgproc, prelude::*};
use std::path::Path;
use tracing::info;

const LABEL: &str = "Pothole";

pub fn annotate_potholes(image: &Frame, potholes: &[Detection], output: &Path) -> Result<()> {
    let mat = Mat::from_slice(&image.data)?;
    let mat = mat.reshape(3, image.height as i32)?;

    let mut output_mat = Mat::default();
    imgproc::cvt_color_def(&mat, &mut output_mat, imgproc::COLOR_RGB2BGR)?;

    let red = core::Scalar::new(0.0, 0.0, 255.0, 0.0);

    for det in potholes {
        let x1 = det.bbox.x1 as i32;
        let y1 = det.bbox.y1 as i32;
        let x2 = det.bbox.x2 as i32;
        let y2 = det.bbox.y2 as i32;

        imgproc::rectangle(
            &mut output_mat,
            core::Rect::new(x1, y1, (x2 - x1).max(1), (y2 - y1).max(1)),
            red,
            2,
            imgproc::LINE_8,
            0,
        )?;

        // label above the box unless it would leave the frame
        let label_y = if y1 - 10 > 10 { y1 - 10 } else { y1 + 10 };
        imgproc::put_text(
            &mut output_mat,
            LABEL,
            core::Point::new(x1, label_y),
            imgproc::FONT_HERSHEY_SIMPLEX,
            0.7,
            red,
            1,
            imgproc::LINE_AA,
            false,
        )?;
    }

    let output_str = output
        .to_str()
        .context("output path is not valid UTF-8")?;
    let written = imgcodecs::imwrite(output_str, &output_mat, &core::Vector::<i32>::new())?;
    if !written {
        anyhow::bail!("OpenCV could not write {}", output.display());
    }

    info!(
        "Annotated {} potholes → {}",
        potholes.len(),
        output.display()
    );
    Ok(())
}
