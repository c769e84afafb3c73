//! Filter-graph construction for timeline renders.
//!
//! Everything here is pure: the caller supplies clip lengths and audio
//! presence up front, and gets back the full FFmpeg argument list.

use crate::error::EditError;
use crate::project::{AudioSource, ClipInput, CompositionInput};
use std::path::Path;

const SILENCE_SOURCE: &str = "anullsrc=r=44100:cl=stereo";
const OUTPUT_FPS: u32 = 30;

/// A ready-to-run render: arguments plus the expected output length.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPlan {
    pub args: Vec<String>,
    pub duration: f64,
}

#[derive(Default)]
struct Graph {
    inputs: Vec<String>,
    filters: Vec<String>,
    input_count: usize,
}

impl Graph {
    fn add_input(&mut self, path: &Path) -> usize {
        self.inputs.push("-i".to_string());
        self.inputs.push(path.to_string_lossy().to_string());
        self.input_count += 1;
        self.input_count - 1
    }

    fn add_lavfi(&mut self, source: String) -> usize {
        self.inputs.extend(["-f".to_string(), "lavfi".to_string(), "-i".to_string(), source]);
        self.input_count += 1;
        self.input_count - 1
    }

    fn filter(&mut self, filter: String) {
        self.filters.push(filter);
    }
}

fn secs(value: f64) -> String {
    format!("{:.3}", value)
}

/// Speech clips worth rendering; a clip without a path is generated silence.
fn playable(clips: &[ClipInput]) -> Vec<&ClipInput> {
    clips.iter().filter(|c| c.length > 0.0).collect()
}

/// Crossfade actually applied: never more than half the shortest clip.
pub fn effective_crossfade(requested: f64, lengths: &[f64]) -> f64 {
    if lengths.len() < 2 || !requested.is_finite() || requested <= 0.0 {
        return 0.0;
    }
    let shortest = lengths.iter().copied().fold(f64::INFINITY, f64::min);
    requested.min(shortest / 2.0).max(0.0)
}

/// Build the FFmpeg arguments (after the binary name) for a timeline render.
pub fn build_composition_args(
    input: &CompositionInput,
    output: &Path,
) -> Result<RenderPlan, EditError> {
    let video: Vec<&ClipInput> = input
        .video
        .iter()
        .filter(|c| c.path.is_some() && c.length > 0.0)
        .collect();

    if video.is_empty() {
        return build_audio_only(input, output);
    }

    let mut graph = Graph::default();
    let indices: Vec<usize> = video
        .iter()
        .filter_map(|c| c.path.as_deref())
        .map(|p| graph.add_input(p))
        .collect();

    let lengths: Vec<f64> = video.iter().map(|c| c.length).collect();
    let xfade = effective_crossfade(input.settings.crossfade.duration_s, &lengths);
    let total = lengths.iter().sum::<f64>() - xfade * (lengths.len() as f64 - 1.0);

    build_video_chain(&mut graph, input, &video, &indices, xfade);

    let audio_label = match input.settings.audio_source {
        AudioSource::None => None,
        AudioSource::Video => build_clip_audio(&mut graph, &video, &indices, xfade),
        AudioSource::Editor => {
            let editor_audio = build_editor_audio(&mut graph, input, total);
            editor_audio.or_else(|| build_clip_audio(&mut graph, &video, &indices, xfade))
        }
    };

    let mut args = vec!["-y".to_string()];
    args.extend(graph.inputs);
    args.push("-filter_complex".to_string());
    args.push(graph.filters.join(";"));
    args.extend(["-map".to_string(), "[vout]".to_string()]);
    match &audio_label {
        Some(label) => args.extend(["-map".to_string(), label.clone()]),
        None => args.push("-an".to_string()),
    }
    push_codecs(&mut args, audio_label.is_some());
    // Per-clip audio can run short of a multi-clip video; only trim single clips.
    if video.len() == 1 && audio_label.is_some() {
        args.push("-shortest".to_string());
    }
    args.push(output.to_string_lossy().to_string());

    Ok(RenderPlan { args, duration: total })
}

fn build_video_chain(
    graph: &mut Graph,
    input: &CompositionInput,
    video: &[&ClipInput],
    indices: &[usize],
    xfade: f64,
) {
    let (w, h) = (input.width, input.height);
    let single = video.len() == 1;

    for (i, (clip, idx)) in video.iter().zip(indices).enumerate() {
        let trim = if clip.trimmed {
            format!(
                "trim=start={}:duration={},setpts=PTS-STARTPTS,",
                secs(clip.trim_start),
                secs(clip.length)
            )
        } else {
            String::new()
        };
        let label = if single { "vout".to_string() } else { format!("v{}", i) };
        graph.filter(format!(
            "[{idx}:v]{trim}scale={w}:{h}:force_original_aspect_ratio=decrease,\
             pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1,fps={OUTPUT_FPS},format=yuv420p,\
             setpts=PTS-STARTPTS[{label}]"
        ));
    }

    if single {
        return;
    }

    if xfade <= 0.0 {
        let labels: String = (0..video.len()).map(|i| format!("[v{}]", i)).collect();
        graph.filter(format!("{}concat=n={}:v=1:a=0[vout]", labels, video.len()));
        return;
    }

    let transition = &input.settings.crossfade.kind;
    let mut offset = video[0].length - xfade;
    let mut prev = "v0".to_string();
    for i in 1..video.len() {
        let out = if i == video.len() - 1 { "vout".to_string() } else { format!("vx{}", i) };
        graph.filter(format!(
            "[{prev}][v{i}]xfade=transition={transition}:duration={}:offset={}[{out}]",
            secs(xfade),
            secs(offset)
        ));
        offset += video[i].length - xfade;
        prev = out;
    }
}

/// Audio embedded in the video clips, aligned clip by clip with the picture.
fn build_clip_audio(
    graph: &mut Graph,
    video: &[&ClipInput],
    indices: &[usize],
    xfade: f64,
) -> Option<String> {
    if !video.iter().any(|c| c.has_audio) {
        return None;
    }

    for (i, (clip, idx)) in video.iter().zip(indices).enumerate() {
        if clip.has_audio {
            graph.filter(format!(
                "[{idx}:a]atrim=start={}:duration={},asetpts=PTS-STARTPTS[ca{i}]",
                secs(clip.trim_start),
                secs(clip.length)
            ));
        } else {
            graph.filter(format!(
                "{SILENCE_SOURCE},atrim=duration={}[ca{i}]",
                secs(clip.length)
            ));
        }
    }

    if video.len() == 1 {
        graph.filter("[ca0]acopy[aout]".to_string());
    } else if xfade > 0.0 {
        let mut prev = "ca0".to_string();
        for i in 1..video.len() {
            let out = if i == video.len() - 1 { "aout".to_string() } else { format!("cx{}", i) };
            graph.filter(format!("[{prev}][ca{i}]acrossfade=d={}[{out}]", secs(xfade)));
            prev = out;
        }
    } else {
        let labels: String = (0..video.len()).map(|i| format!("[ca{}]", i)).collect();
        graph.filter(format!("{}concat=n={}:v=0:a=1[aout]", labels, video.len()));
    }
    Some("[aout]".to_string())
}

/// Speech and music tracks mixed together. `None` when both are empty.
fn build_editor_audio(graph: &mut Graph, input: &CompositionInput, total: f64) -> Option<String> {
    let mut tracks = Vec::new();

    if let Some(label) = build_music(graph, input, total) {
        tracks.push(label);
    }
    if let Some(label) = build_speech(graph, input) {
        tracks.push(label);
    }

    match tracks.len() {
        0 => None,
        1 => {
            graph.filter(format!("{}acopy[aout]", tracks[0]));
            Some("[aout]".to_string())
        }
        n => {
            graph.filter(format!("{}amix=inputs={}:normalize=0[aout]", tracks.concat(), n));
            Some("[aout]".to_string())
        }
    }
}

/// Trim each clip's audio and join them into `[<name>_raw]`.
fn join_audio_clips(graph: &mut Graph, clips: &[&ClipInput], name: &str) -> String {
    let mut labels = Vec::with_capacity(clips.len());

    for (i, clip) in clips.iter().enumerate() {
        let label = format!("[{}{}]", name, i);
        match clip.path.as_deref() {
            Some(path) => {
                let idx = graph.add_input(path);
                if clip.trimmed {
                    graph.filter(format!(
                        "[{idx}:a]atrim=start={}:duration={},asetpts=PTS-STARTPTS{label}",
                        secs(clip.trim_start),
                        secs(clip.length)
                    ));
                } else {
                    graph.filter(format!("[{idx}:a]acopy{label}"));
                }
            }
            None => graph.filter(format!(
                "{SILENCE_SOURCE},atrim=duration={}{label}",
                secs(clip.length)
            )),
        }
        labels.push(label);
    }

    let raw = format!("[{}_raw]", name);
    if labels.len() == 1 {
        graph.filter(format!("{}acopy{}", labels[0], raw));
    } else {
        graph.filter(format!("{}concat=n={}:v=0:a=1{}", labels.concat(), labels.len(), raw));
    }
    raw
}

fn build_speech(graph: &mut Graph, input: &CompositionInput) -> Option<String> {
    let clips = playable(&input.speech);
    if clips.is_empty() {
        return None;
    }
    let raw = join_audio_clips(graph, &clips, "sp");
    if (input.speech_gain - 1.0).abs() > f64::EPSILON {
        graph.filter(format!("{raw}volume={:.2}[speech]", input.speech_gain));
    } else {
        graph.filter(format!("{raw}acopy[speech]"));
    }
    Some("[speech]".to_string())
}

fn build_music(graph: &mut Graph, input: &CompositionInput, total: f64) -> Option<String> {
    let clips: Vec<&ClipInput> = input
        .music
        .iter()
        .filter(|c| c.path.is_some() && c.length > 0.0)
        .collect();
    if clips.is_empty() {
        return None;
    }
    let music_len: f64 = clips.iter().map(|c| c.length).sum();
    let raw = join_audio_clips(graph, &clips, "mu");

    let mut chain = Vec::new();
    if music_len > total {
        chain.push(format!("atrim=duration={}", secs(total)));
    }
    if (input.music_gain - 1.0).abs() > f64::EPSILON {
        chain.push(format!("volume={:.2}", input.music_gain));
    }
    let settings = &input.settings;
    if settings.music_fade_in > 0.0 {
        chain.push(format!("afade=t=in:st=0:d={}", secs(settings.music_fade_in)));
    }
    if settings.music_fade_out > 0.0 {
        let start = (music_len.min(total) - settings.music_fade_out).max(0.0);
        chain.push(format!(
            "afade=t=out:st={}:d={}",
            secs(start),
            secs(settings.music_fade_out)
        ));
    }
    if chain.is_empty() {
        chain.push("acopy".to_string());
    }
    graph.filter(format!("{raw}{}[music]", chain.join(",")));
    Some("[music]".to_string())
}

/// No video clips: black frames for as long as the longest audio track.
fn build_audio_only(input: &CompositionInput, output: &Path) -> Result<RenderPlan, EditError> {
    let speech_len: f64 = playable(&input.speech).iter().map(|c| c.length).sum();
    let music_len: f64 = input
        .music
        .iter()
        .filter(|c| c.path.is_some())
        .map(|c| c.length.max(0.0))
        .sum();
    let total = speech_len.max(music_len);
    if total <= 0.0 {
        return Err(EditError::EmptyComposition);
    }

    let mut graph = Graph::default();
    graph.add_lavfi(format!(
        "color=c=black:s={}x{}:r={}:d={}",
        input.width,
        input.height,
        OUTPUT_FPS,
        secs(total)
    ));
    let audio = build_editor_audio(&mut graph, input, total).ok_or(EditError::EmptyComposition)?;

    let mut args = vec!["-y".to_string()];
    args.extend(graph.inputs);
    args.push("-filter_complex".to_string());
    args.push(graph.filters.join(";"));
    args.extend(["-map".to_string(), "0:v".to_string(), "-map".to_string(), audio]);
    push_codecs(&mut args, true);
    args.push("-shortest".to_string());
    args.push(output.to_string_lossy().to_string());

    Ok(RenderPlan { args, duration: total })
}

fn push_codecs(args: &mut Vec<String>, with_audio: bool) {
    args.extend(
        ["-c:v", "libx264", "-preset", "medium", "-crf", "23", "-pix_fmt", "yuv420p"]
            .iter()
            .map(|s| s.to_string()),
    );
    if with_audio {
        args.extend(["-c:a", "aac", "-b:a", "192k"].iter().map(|s| s.to_string()));
    }
}
