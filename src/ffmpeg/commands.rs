use std::path::Path;

/// Even-dimension scale required by yuv420p.
const EVEN_SCALE: &str = "scale=trunc(iw/2)*2:trunc(ih/2)*2";

/// Build FFmpeg arguments that encode a numbered PNG sequence into an MP4.
///
/// `frame_pattern` is a printf-style path such as `frames/frame_%05d.png`.
/// With an audio file the output is cut to the shorter of the two streams.
pub fn build_slideshow_args(
    frame_pattern: &Path,
    fps: u32,
    crf: u32,
    audio: Option<&Path>,
    output: &Path,
) -> Vec<String> {
    let mut args = vec![
        "-y".to_string(),
        "-framerate".to_string(),
        fps.max(1).to_string(),
        "-i".to_string(),
        frame_pattern.to_string_lossy().to_string(),
    ];

    if let Some(audio) = audio {
        args.push("-i".to_string());
        args.push(audio.to_string_lossy().to_string());
    }

    args.extend(
        [
            "-c:v", "libx264",
            "-pix_fmt", "yuv420p",
            "-preset", "medium",
        ]
        .iter()
        .map(|s| s.to_string()),
    );
    args.push("-crf".to_string());
    args.push(crf.to_string());

    if audio.is_some() {
        args.extend(
            ["-c:a", "aac", "-b:a", "192k", "-shortest", "-map", "0:v:0", "-map", "1:a:0"]
                .iter()
                .map(|s| s.to_string()),
        );
    }

    args.extend(
        ["-movflags", "+faststart", "-vf", EVEN_SCALE]
            .iter()
            .map(|s| s.to_string()),
    );
    args.push(output.to_string_lossy().to_string());
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slideshow_without_audio() {
        let args = build_slideshow_args(
            Path::new("/tmp/f/frame_%05d.png"),
            2,
            18,
            None,
            Path::new("out.mp4"),
        );
        assert_eq!(&args[..5], ["-y", "-framerate", "2", "-i", "/tmp/f/frame_%05d.png"]);
        assert!(args.windows(2).any(|w| w[0] == "-crf" && w[1] == "18"));
        assert!(args.windows(2).any(|w| w[0] == "-movflags" && w[1] == "+faststart"));
        assert!(args.contains(&EVEN_SCALE.to_string()));
        assert!(!args.contains(&"-shortest".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("out.mp4"));
    }

    #[test]
    fn test_slideshow_with_audio() {
        let args = build_slideshow_args(
            Path::new("frame_%05d.png"),
            0,
            23,
            Some(Path::new("narration.mp3")),
            Path::new("out.mp4"),
        );
        assert_eq!(args[2], "1");
        assert!(args.windows(2).any(|w| w[0] == "-i" && w[1] == "narration.mp3"));
        assert!(args.contains(&"-shortest".to_string()));
        assert!(args.windows(2).any(|w| w[0] == "-map" && w[1] == "1:a:0"));
    }
}
