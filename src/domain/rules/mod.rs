// Domain rules - Filter graph and engine argument construction

use crate::domain::model::*;
use crate::utils::time::format_timestamp;


/// Palette stages closing every graph: one palette for the whole clip, then remap
pub const PALETTE_STAGES: &str = "split[a][b],[a]palettegen[p],[b][p]paletteuse";

/// Filter used to build a browser-playable preview
pub const PREVIEW_FILTER: &str = "scale=-2:580:flags=lanczos";

/// Ordered engine arguments plus the graph they carry
#[derive(Debug, Clone, PartialEq)]
pub struct EncodePlan {
    pub args: Vec<String>,
    pub filter_graph: String,
}

/// Builds filter graphs and argument lists.
///
/// Stage order is fixed: fps, crop, scale, mpdecimate, palette. A stage is
/// emitted only when its option is present.
pub struct FilterChainBuilder;

impl FilterChainBuilder {
    /// Filter graph for the given settings and optional source crop
    pub fn filter_graph(settings: &EncodingSettings, crop: Option<&SourceCropBox>) -> String {
        let mut stages: Vec<String> = Vec::with_capacity(5);

        if let Some(fps) = settings.fps {
            stages.push(format!("fps={}", fps));
        }
        if let Some(crop) = crop {
            stages.push(format!("crop={}", crop));
        }
        if let Some(height) = settings.height {
            stages.push(format!("scale=-1:{}", height));
        }
        if let Some(threshold) = settings.mpdecimate {
            stages.push(format!("mpdecimate={}", threshold));
        }
        stages.push(PALETTE_STAGES.to_string());

        stages.join(",")
    }

    /// Arguments placed before `-i`; `None` means trim is disabled
    pub fn trim_args(trim: Option<&TrimSelection>) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(trim) = trim {
            if let Some(end) = trim.end_bound() {
                args.push("-to".to_string());
                args.push(format_timestamp(end));
            }
            if let Some(start) = trim.start_bound() {
                args.push("-ss".to_string());
                args.push(format_timestamp(start));
            }
        }
        args
    }

    /// Full argument list for one encode
    pub fn encode_plan(
        settings: &EncodingSettings,
        crop: Option<&SourceCropBox>,
        trim: Option<&TrimSelection>,
        input_name: &str,
        output_name: &str,
    ) -> EncodePlan {
        let filter_graph = Self::filter_graph(settings, crop);

        let mut args = vec!["-hide_banner".to_string()];
        args.extend(Self::trim_args(trim));
        args.extend([
            "-i".to_string(),
            input_name.to_string(),
            "-lavfi".to_string(),
            filter_graph.clone(),
            output_name.to_string(),
        ]);

        EncodePlan { args, filter_graph }
    }

    /// Arguments that transcode an input into a small H.264 preview
    pub fn preview_args(input_name: &str, output_name: &str) -> Vec<String> {
        [
            "-hide_banner",
            "-i",
            input_name,
            "-c:v",
            "libx264",
            "-crf",
            "35",
            "-preset",
            "ultrafast",
            "-an",
            "-pix_fmt",
            "yuv420p",
            "-lavfi",
            PREVIEW_FILTER,
            output_name,
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    /// Arguments that make the engine print stream facts and exit
    pub fn probe_args(input_name: &str) -> Vec<String> {
        vec![
            "-hide_banner".to_string(),
            "-i".to_string(),
            input_name.to_string(),
        ]
    }

    /// Settings with the job's height choice applied
    pub fn effective_settings(
        settings: &EncodingSettings,
        height_override: Option<HeightOverride>,
    ) -> EncodingSettings {
        EncodingSettings {
            height: HeightOverride::resolve(height_override, settings),
            ..settings.clone()
        }
    }
}
