//! Host pixel row addressing under an unpack alignment.

/// Bytes between the starts of consecutive host rows.
#[inline]
pub fn row_pitch(width: u32, bytes_per_pixel: u32, alignment: u32) -> usize {
    let row = width as usize * bytes_per_pixel as usize;
    let align = alignment.max(1) as usize;
    row.div_ceil(align) * align
}

/// Minimum host buffer length for an image. The last row is not padded.
#[inline]
pub fn required_len(width: u32, height: u32, bytes_per_pixel: u32, alignment: u32) -> usize {
    if width == 0 || height == 0 {
        return 0;
    }
    let row = width as usize * bytes_per_pixel as usize;
    row_pitch(width, bytes_per_pixel, alignment) * (height as usize - 1) + row
}

/// Gathers an image's rows into a tightly packed copy.
///
/// Rows are read at `row_pitch` intervals, exactly as a GL driver reads client
/// memory. Feeding tightly packed rows with a pitch larger than the row size
/// therefore reproduces the skew a misconfigured upload produces on hardware.
/// Returns `None` if `pixels` is shorter than [`required_len`].
pub fn unpack_rows(
    pixels: &[u8],
    width: u32,
    height: u32,
    bytes_per_pixel: u32,
    alignment: u32,
) -> Option<Vec<u8>> {
    if pixels.len() < required_len(width, height, bytes_per_pixel, alignment) {
        return None;
    }

    let row = width as usize * bytes_per_pixel as usize;
    let pitch = row_pitch(width, bytes_per_pixel, alignment);

    let mut out = Vec::with_capacity(row * height as usize);
    for y in 0..height as usize {
        let start = y * pitch;
        out.extend_from_slice(&pixels[start..start + row]);
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pitch_rounds_up_to_alignment() {
        assert_eq!(row_pitch(3, 3, 4), 12);
        assert_eq!(row_pitch(101, 3, 4), 304);
        assert_eq!(row_pitch(101, 3, 1), 303);
        assert_eq!(row_pitch(100, 3, 4), 300);
    }

    #[test]
    fn required_len_skips_last_row_padding() {
        // 3 rows of 6 bytes padded to 8: 8 + 8 + 6.
        assert_eq!(required_len(2, 3, 3, 8), 22);
        assert_eq!(required_len(0, 3, 3, 4), 0);
    }

    #[test]
    fn packed_rows_round_trip_with_byte_alignment() {
        let px: Vec<u8> = (0..18).collect();
        assert_eq!(unpack_rows(&px, 2, 3, 3, 1).unwrap(), px);
    }

    #[test]
    fn padded_rows_drop_padding() {
        // Two 1x RGB rows, each padded to 4 bytes.
        let px = [1, 2, 3, 0, 4, 5, 6];
        assert_eq!(unpack_rows(&px, 1, 2, 3, 4).unwrap(), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn tight_rows_under_word_alignment_skew() {
        // Three tightly packed 1x RGB rows read with a 4-byte pitch: the second
        // row starts one byte late and the third is out of range.
        let px = [1, 2, 3, 4, 5, 6, 7, 8, 9];
        let rows = unpack_rows(&px, 1, 3, 3, 4);
        assert!(rows.is_none() || rows.as_deref() != Some(&px[..]));

        let two = unpack_rows(&px[..7], 1, 2, 3, 4).unwrap();
        assert_eq!(two, vec![1, 2, 3, 5, 6, 7]);
    }

    #[test]
    fn short_buffer_is_rejected() {
        assert!(unpack_rows(&[0; 5], 2, 1, 3, 1).is_none());
    }
}
