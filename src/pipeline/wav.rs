use std::io::Cursor;

use crate::audio::RenderedBuffer;

/// Size of the canonical PCM header in front of the sample data.
pub const HEADER_LEN: usize = 44;

/// Float to signed 16-bit: clamp, then scale the negative and positive halves
/// separately so both -1.0 and 1.0 hit the ends of the range.
pub fn float_to_i16(x: f32) -> i16 {
    let x = if x.is_nan() { 0.0 } else { x.clamp(-1.0, 1.0) };
    let scaled = if x < 0.0 { x * 32768.0 } else { x * 32767.0 };
    scaled.round() as i16
}

/// Encodes a rendered buffer as a RIFF/WAVE file with 16-bit PCM samples.
///
/// Mono and stereo buffers get the canonical 44-byte header (`fmt ` chunk of
/// 16 bytes, format code 1), followed by the interleaved samples.
pub fn encode(rendered: &RenderedBuffer) -> hound::Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: rendered.channels(),
        sample_rate: rendered.sample_rate(),
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut bytes = Vec::with_capacity(HEADER_LEN + rendered.samples().len() * 2);
    {
        let mut writer = hound::WavWriter::new(Cursor::new(&mut bytes), spec)?;
        for &s in rendered.samples() {
            writer.write_sample(float_to_i16(s))?;
        }
        writer.finalize()?;
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u16_at(b: &[u8], at: usize) -> u16 {
        u16::from_le_bytes([b[at], b[at + 1]])
    }

    fn u32_at(b: &[u8], at: usize) -> u32 {
        u32::from_le_bytes([b[at], b[at + 1], b[at + 2], b[at + 3]])
    }

    #[test]
    fn test_float_conversion() {
        assert_eq!(float_to_i16(1.0), 32767);
        assert_eq!(float_to_i16(-1.0), -32768);
        assert_eq!(float_to_i16(2.5), 32767);
        assert_eq!(float_to_i16(-7.0), -32768);
        assert_eq!(float_to_i16(0.0), 0);
        assert_eq!(float_to_i16(0.5), 16384); // 16383.5 rounds away from zero
        assert_eq!(float_to_i16(-0.5), -16384);
        assert_eq!(float_to_i16(f32::NAN), 0);
    }

    #[test]
    fn test_mono_two_frame_layout() {
        let rendered = RenderedBuffer::new(8000, 1, vec![1.0, -1.0]);
        let b = encode(&rendered).unwrap();

        assert_eq!(b.len(), 48);
        assert_eq!(&b[0..4], b"RIFF");
        assert_eq!(u32_at(&b, 4), 40);
        assert_eq!(&b[8..12], b"WAVE");
        assert_eq!(&b[12..16], b"fmt ");
        assert_eq!(u32_at(&b, 16), 16);
        assert_eq!(u16_at(&b, 20), 1);
        assert_eq!(u16_at(&b, 22), 1);
        assert_eq!(u32_at(&b, 24), 8000);
        assert_eq!(u32_at(&b, 28), 16000);
        assert_eq!(u16_at(&b, 32), 2);
        assert_eq!(u16_at(&b, 34), 16);
        assert_eq!(&b[36..40], b"data");
        assert_eq!(u32_at(&b, 40), 4);
        assert_eq!(i16::from_le_bytes([b[44], b[45]]), 32767);
        assert_eq!(i16::from_le_bytes([b[46], b[47]]), -32768);
    }

    #[test]
    fn test_stereo_is_interleaved_frame_major() {
        let rendered = RenderedBuffer::new(44100, 2, vec![0.0, 1.0, -1.0, 0.0]);
        let b = encode(&rendered).unwrap();

        assert_eq!(b.len(), 44 + 8);
        assert_eq!(u32_at(&b, 4), 36 + 8);
        assert_eq!(u16_at(&b, 22), 2);
        assert_eq!(u32_at(&b, 28), 44100 * 2 * 2);
        assert_eq!(u16_at(&b, 32), 4);
        let samples: Vec<i16> = b[44..]
            .chunks_exact(2)
            .map(|c| i16::from_le_bytes([c[0], c[1]]))
            .collect();
        assert_eq!(samples, vec![0, 32767, -32768, 0]);
    }

    #[test]
    fn test_output_reads_back() {
        let rendered = RenderedBuffer::new(22050, 2, vec![0.25; 64]);
        let bytes = encode(&rendered).unwrap();
        let mut reader = hound::WavReader::new(bytes.as_slice()).unwrap();
        assert_eq!(reader.duration(), 32);
        assert_eq!(reader.spec().channels, 2);
        assert!(reader.samples::<i16>().all(|s| s.unwrap() == 8192));
    }
}
