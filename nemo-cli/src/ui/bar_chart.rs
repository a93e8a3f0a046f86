/// Unicode partial block characters for smooth progress bars
const BLOCKS: [char; 9] = [' ', '▏', '▎', '▍', '▌', '▋', '▊', '▉', '█'];

/// Width of the moving segment of an indeterminate bar
const PULSE_WIDTH: usize = 6;

/// Render a progress bar for `fraction` (0.0 to 1.0) using partial block characters
pub fn render_bar(fraction: f64, width: usize) -> String {
    if width == 0 {
        return String::new();
    }

    let fraction = if fraction.is_nan() {
        0.0
    } else {
        fraction.clamp(0.0, 1.0)
    };
    let filled_width = fraction * width as f64;
    let full_blocks = filled_width.floor() as usize;
    let partial = ((filled_width - full_blocks as f64) * 8.0).round() as usize;

    let mut bar = String::with_capacity(width * 3); // Unicode chars can be multi-byte

    // Full blocks
    for _ in 0..full_blocks.min(width) {
        bar.push(BLOCKS[8]);
    }

    // Partial block
    if full_blocks < width && partial > 0 {
        bar.push(BLOCKS[partial.min(8)]);
    }

    // Pad to width
    let current_len = bar.chars().count();
    for _ in current_len..width {
        bar.push(' ');
    }

    bar
}

/// Render a bar with a segment bouncing back and forth, for work of unknown size
pub fn render_pulse(frame: usize, width: usize) -> String {
    if width == 0 {
        return String::new();
    }

    let segment = PULSE_WIDTH.min(width);
    let travel = width - segment;
    let start = if travel == 0 {
        0
    } else {
        let step = frame % (2 * travel);
        if step <= travel { step } else { 2 * travel - step }
    };

    (0..width)
        .map(|i| {
            if i >= start && i < start + segment {
                BLOCKS[8]
            } else {
                ' '
            }
        })
        .collect()
}
