pub mod capture_buffer;
pub mod pcm_codec;
pub mod wav_format;
