use clap::builder::styling::{AnsiColor, Color, Style};
use clap::builder::Styles;
use crossterm::style::{Attribute, Color as CtColor, Stylize};
use unicode_width::UnicodeWidthStr;

// ═══════════════════════════════════════════════════════════════════════════════
// Clap Styles
// ═══════════════════════════════════════════════════════════════════════════════

fn ansi(color: AnsiColor) -> Style {
    Style::new().bold().fg_color(Some(Color::Ansi(color)))
}

pub fn get_styles() -> Styles {
    Styles::styled()
        .usage(ansi(AnsiColor::Green).underline())
        .header(ansi(AnsiColor::Green).underline())
        .literal(ansi(AnsiColor::Magenta))
        .invalid(ansi(AnsiColor::Red))
        .error(ansi(AnsiColor::Red))
        .valid(ansi(AnsiColor::Green))
        .placeholder(Style::new().fg_color(Some(Color::Ansi(AnsiColor::BrightBlack))))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Palette
// ═══════════════════════════════════════════════════════════════════════════════

pub mod colors {
    use crossterm::style::Color;

    const fn rgb(r: u8, g: u8, b: u8) -> Color {
        Color::Rgb { r, g, b }
    }

    pub const ACCENT: Color = rgb(30, 215, 96);
    pub const HIGHLIGHT: Color = rgb(255, 0, 255);
    pub const MUTED_PURPLE: Color = rgb(180, 100, 255);
    pub const WARN: Color = rgb(255, 165, 0);
    pub const FAIL: Color = rgb(255, 85, 85);
    pub const NOTE: Color = rgb(100, 149, 237);
    pub const DIM: Color = rgb(128, 128, 128);
    pub const TEXT: Color = rgb(255, 255, 255);
}

mod glyphs {
    pub const RULE: &str = "─";
    pub const CORNERS: [&str; 4] = ["╭", "╮", "╰", "╯"];
    pub const ARROW: &str = "▶";
    pub const BULLET: &str = "●";
    pub const EMPTY: &str = "○";
    pub const DIAMOND: &str = "◆";
    pub const SWATCH: &str = "██";
}

const SECTION_WIDTH: usize = 60;

fn rule(width: usize) -> String {
    glyphs::RULE.repeat(width)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Banner
// ═══════════════════════════════════════════════════════════════════════════════

pub fn print_banner() {
    let title = format!(" {} aurafy ", glyphs::DIAMOND);
    let subtitle = " auth & aura cli ";
    let fill = SECTION_WIDTH.saturating_sub(title.width() + subtitle.width());

    println!();
    println!(
        "  {}{}{}",
        title.with(colors::ACCENT).bold(),
        rule(fill).with(colors::MUTED_PURPLE),
        subtitle.with(colors::DIM).attribute(Attribute::Italic)
    );
    println!();
}

// ═══════════════════════════════════════════════════════════════════════════════
// Status lines
// ═══════════════════════════════════════════════════════════════════════════════

fn print_status(symbol: &str, color: CtColor, message: &str) {
    println!(" {} {}", symbol.with(color).bold(), message.with(color));
}

pub fn print_success(message: &str) {
    print_status("✓", colors::ACCENT, message);
}

pub fn print_error(message: &str) {
    print_status("✗", colors::FAIL, message);
}

pub fn print_warning(message: &str) {
    print_status("⚠", colors::WARN, message);
}

pub fn print_info(message: &str) {
    print_status("ℹ", colors::NOTE, message);
}

// ═══════════════════════════════════════════════════════════════════════════════
// Sections
// ═══════════════════════════════════════════════════════════════════════════════

pub fn print_section_header(title: &str) {
    let [top_left, top_right, _, _] = glyphs::CORNERS;
    let used = title.width() + 2;
    let left = SECTION_WIDTH.saturating_sub(used) / 2;
    let right = SECTION_WIDTH.saturating_sub(used + left);

    println!();
    println!(
        "{}{} {} {}{}",
        top_left.with(colors::ACCENT),
        rule(left).with(colors::ACCENT),
        title.with(colors::ACCENT).bold(),
        rule(right).with(colors::ACCENT),
        top_right.with(colors::ACCENT)
    );
}

pub fn print_section_footer() {
    let [_, _, bottom_left, bottom_right] = glyphs::CORNERS;
    println!(
        "{}{}{}",
        bottom_left.with(colors::ACCENT),
        rule(SECTION_WIDTH).with(colors::ACCENT),
        bottom_right.with(colors::ACCENT)
    );
    println!();
}

// ═══════════════════════════════════════════════════════════════════════════════
// Rows
// ═══════════════════════════════════════════════════════════════════════════════

pub fn print_key_value(key: &str, value: &str) {
    println!(
        "  {} {} {}",
        glyphs::BULLET.with(colors::MUTED_PURPLE),
        format!("{}:", key).with(colors::DIM),
        value.with(colors::TEXT)
    );
}

/// Same as [`print_key_value`], for the headline value of a section.
pub fn print_key_value_highlight(key: &str, value: &str) {
    println!(
        "  {} {} {}",
        glyphs::DIAMOND.with(colors::HIGHLIGHT),
        format!("{}:", key).with(colors::ACCENT).bold(),
        value.with(colors::TEXT).bold()
    );
}

pub fn print_list_item(item: &str, indent: usize) {
    println!(
        "{}{}  {}",
        "  ".repeat(indent),
        glyphs::ARROW.with(colors::ACCENT),
        item.with(colors::TEXT)
    );
}

pub fn print_empty_list(message: &str) {
    println!(
        "  {} {}",
        glyphs::EMPTY.with(colors::DIM),
        message.with(colors::DIM).attribute(Attribute::Italic)
    );
}

// ═══════════════════════════════════════════════════════════════════════════════
// Aura swatches
// ═══════════════════════════════════════════════════════════════════════════════

/// Parse a `#RRGGBB` color as used by mood descriptors.
pub fn hex_color(hex: &str) -> Option<CtColor> {
    let digits = hex.strip_prefix('#')?;
    if digits.len() != 6 || !digits.is_ascii() {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&digits[range], 16).ok();
    Some(CtColor::Rgb {
        r: channel(0..2)?,
        g: channel(2..4)?,
        b: channel(4..6)?,
    })
}

/// A colored block followed by the mood name, falling back to plain text.
pub fn print_swatch(name: &str, hex: &str, indent: usize) {
    let indent_str = "  ".repeat(indent);
    match hex_color(hex) {
        Some(color) => println!(
            "{}{} {} {}",
            indent_str,
            glyphs::SWATCH.with(color),
            name.with(color).bold(),
            hex.with(colors::DIM)
        ),
        None => println!("{}{} {}", indent_str, name.bold(), hex.with(colors::DIM)),
    }
}

pub fn print_goodbye() {
    println!();
    println!("  {}", "Bye, keep the aura up.".with(colors::MUTED_PURPLE).bold());
    println!();
}
