use axum::extract::Multipart;

use crate::{
    foundation::error::{FilmgrainError, FilmgrainResult},
    grain::params::{GrainParameters, GrainType},
    normalize::normalizer::SourceImage,
};

/// Name of the multipart field carrying the image.
pub const FILE_FIELD: &str = "file";

/// A parsed `POST /process` request.
#[derive(Clone, Debug)]
pub struct ProcessForm {
    /// Uploaded image.
    pub source: SourceImage,
    /// Grain settings from the text fields.
    pub params: GrainParameters,
}

impl ProcessForm {
    /// Read every field of `multipart`. The `file` field is required.
    pub async fn from_multipart(mut multipart: Multipart) -> FilmgrainResult<Self> {
        let mut source = None;
        let mut params = GrainParameters::default();

        while let Some(field) = multipart.next_field().await.map_err(malformed)? {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };

            if name == FILE_FIELD {
                let hint = field
                    .file_name()
                    .or_else(|| field.content_type())
                    .map(str::to_owned);
                let bytes = field.bytes().await.map_err(malformed)?;
                let upload = SourceImage::new(bytes.to_vec());
                source = Some(match hint {
                    Some(hint) => upload.with_declared_format(hint),
                    None => upload,
                });
                continue;
            }

            let value = field.text().await.map_err(malformed)?;
            apply_field(&mut params, &name, &value)?;
        }

        let source = source.ok_or_else(|| {
            FilmgrainError::validation(format!("missing '{FILE_FIELD}' upload"))
        })?;
        Ok(Self { source, params })
    }
}

fn malformed(err: axum::extract::multipart::MultipartError) -> FilmgrainError {
    FilmgrainError::validation(format!("malformed multipart body: {}", err.body_text()))
}

/// Set the parameter named by form field `name`. Unknown fields are ignored; blank values
/// leave the parameter unset.
pub fn apply_field(params: &mut GrainParameters, name: &str, value: &str) -> FilmgrainResult<()> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(());
    }

    match name {
        "scale" => params.scale = Some(parse_number(name, value)?),
        "grain_power" | "grainPower" => params.grain_power = Some(parse_number(name, value)?),
        "shadows" => params.shadows = Some(parse_number(name, value)?),
        "highs" => params.highs = Some(parse_number(name, value)?),
        "grain_type" | "grainType" => params.grain_type = Some(value.parse::<GrainType>()?),
        "grain_sat" | "grainSat" | "grainSaturation" => {
            params.grain_saturation = Some(parse_number(name, value)?)
        }
        "sharpen" => {
            params.sharpen = Some(value.parse().map_err(|_| {
                FilmgrainError::validation(format!(
                    "sharpen must be a non-negative integer, got '{value}'"
                ))
            })?)
        }
        "gray" => params.gray = parse_flag(name, value)?,
        other => tracing::debug!(field = other, "ignoring form field"),
    }
    Ok(())
}

fn parse_number(name: &str, value: &str) -> FilmgrainResult<f64> {
    value
        .parse()
        .map_err(|_| FilmgrainError::validation(format!("{name} must be a number, got '{value}'")))
}

fn parse_flag(name: &str, value: &str) -> FilmgrainResult<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Ok(true),
        "false" | "0" | "off" | "no" => Ok(false),
        _ => Err(FilmgrainError::validation(format!(
            "{name} must be a boolean, got '{value}'"
        ))),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/server/form.rs"]
mod tests;
