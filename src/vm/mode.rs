use crate::render::bitmap::Rgba8;

/// A GRASP video mode: pixel resolution, color depth and display class.
///
/// Text modes (0, 1, 2) are rendered as pixel canvases at 8x8 character
/// cells, so a 40x25 text screen becomes a 320x200 bitmap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VideoMode {
    /// Mode code as written in the script, upper-cased.
    pub code: char,
    /// Canvas width in pixels.
    pub width: u32,
    /// Canvas height in pixels.
    pub height: u32,
    /// Number of displayable colors.
    pub colors: u16,
    /// Display adapter class, for diagnostics.
    pub kind: &'static str,
}

const fn m(code: char, width: u32, height: u32, colors: u16, kind: &'static str) -> VideoMode {
    VideoMode {
        code,
        width,
        height,
        colors,
        kind,
    }
}

/// Mode table from the GRASP 1.10c documentation. Mode L is the
/// undocumented VGA mode seen in later containers.
pub fn lookup(code: &str) -> Option<VideoMode> {
    let code = code.trim();
    let mut chars = code.chars();
    let c = chars.next()?.to_ascii_uppercase();
    if chars.next().is_some() {
        return None;
    }
    Some(match c {
        '0' => m('0', 320, 200, 16, "IBM 40 column text"),
        '1' => m('1', 640, 200, 16, "IBM 80 column text"),
        '2' => m('2', 640, 200, 2, "IBM 80 column text"),
        'A' => m('A', 320, 200, 4, "IBM CGA"),
        'B' => m('B', 320, 200, 16, "IBM PCjr/STB"),
        'C' => m('C', 640, 200, 2, "IBM CGA"),
        'D' => m('D', 640, 200, 64, "IBM EGA"),
        'E' => m('E', 640, 350, 2, "IBM EGA monochrome"),
        'F' => m('F', 640, 350, 4, "IBM EGA"),
        'G' => m('G', 640, 350, 64, "IBM EGA"),
        'H' => m('H', 720, 348, 2, "Hercules monochrome"),
        'I' => m('I', 320, 200, 16, "Plantronics/AST CGP"),
        'J' => m('J', 320, 200, 16, "IBM EGA"),
        'L' => m('L', 320, 200, 256, "IBM VGA"),
        _ => return None,
    })
}

impl VideoMode {
    /// The fixed hardware palette for this mode's color depth, indexed by
    /// the values `COLOR` takes.
    pub fn palette(&self) -> Vec<Rgba8> {
        hardware_palette(self.colors)
    }
}

/// Standard CGA 16-color table, also the base of the larger palettes.
const CGA16: [Rgba8; 16] = [
    Rgba8::opaque(0, 0, 0),
    Rgba8::opaque(0, 0, 170),
    Rgba8::opaque(0, 170, 0),
    Rgba8::opaque(0, 170, 170),
    Rgba8::opaque(170, 0, 0),
    Rgba8::opaque(170, 0, 170),
    Rgba8::opaque(170, 85, 0),
    Rgba8::opaque(170, 170, 170),
    Rgba8::opaque(85, 85, 85),
    Rgba8::opaque(85, 85, 255),
    Rgba8::opaque(85, 255, 85),
    Rgba8::opaque(85, 255, 255),
    Rgba8::opaque(255, 85, 85),
    Rgba8::opaque(255, 85, 255),
    Rgba8::opaque(255, 255, 85),
    Rgba8::opaque(255, 255, 255),
];

fn hardware_palette(colors: u16) -> Vec<Rgba8> {
    match colors {
        2 => vec![Rgba8::BLACK, Rgba8::WHITE],
        // CGA palette 1, high intensity: black, cyan, magenta, white.
        4 => vec![
            Rgba8::BLACK,
            Rgba8::opaque(85, 255, 255),
            Rgba8::opaque(255, 85, 255),
            Rgba8::WHITE,
        ],
        64 => (0u16..64).map(ega_color).collect(),
        256 => vga_default(),
        _ => CGA16.to_vec(),
    }
}

/// EGA 6-bit color: bits `rgbRGB`, uppercase the high-intensity bit.
fn ega_color(i: u16) -> Rgba8 {
    let chan = |hi: u16, lo: u16| (((hi & 1) * 2 + (lo & 1)) * 85) as u8;
    Rgba8::opaque(
        chan(i >> 2, i >> 5),
        chan(i >> 1, i >> 4),
        chan(i, i >> 3),
    )
}

/// Approximation of the VGA default DAC: the 16 CGA colors, a 16-step gray
/// ramp, a 6x6x6 color cube, and a black tail.
fn vga_default() -> Vec<Rgba8> {
    let mut pal = CGA16.to_vec();
    for i in 0..16u16 {
        let v = (i * 255 / 15) as u8;
        pal.push(Rgba8::opaque(v, v, v));
    }
    for r in 0..6u16 {
        for g in 0..6u16 {
            for b in 0..6u16 {
                pal.push(Rgba8::opaque(
                    (r * 255 / 5) as u8,
                    (g * 255 / 5) as u8,
                    (b * 255 / 5) as u8,
                ));
            }
        }
    }
    pal.resize(256, Rgba8::BLACK);
    pal
}
