//! Self-contained HTML markup for playing back synthesized speech.

use crate::audio::AudioFormat;
use crate::tts::SynthesizedAudio;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Render `audio` as an autoplaying `<audio>` element with an inline data URI.
///
/// The MIME type follows the sniffed container unless `label` overrides it.
/// Output is a pure function of the inputs.
pub fn encode_for_playback(audio: &SynthesizedAudio, label: Option<AudioFormat>) -> String {
    let mime = label.unwrap_or(audio.format).mime_type();
    let payload = STANDARD.encode(&audio.bytes);
    format!(
        "<audio controls autoplay><source src=\"data:{mime};base64,{payload}\" type=\"{mime}\"></audio>"
    )
}

/// Extract and decode the payload of markup produced by [`encode_for_playback`].
///
/// Returns `None` if the markup does not contain a base64 data URI.
pub fn decode_playback_payload(markup: &str) -> Option<Vec<u8>> {
    let start = markup.find(";base64,")? + ";base64,".len();
    let end = start + markup[start..].find('"')?;
    STANDARD.decode(&markup[start..end]).ok()
}
