//! PDF writer.
//!
//! Rows are laid out as a fixed-width table using the built-in Helvetica
//! faces. Every page repeats the title and header row; the `Page N of M`
//! footers are stamped once the page count is known.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use printpdf::{
    BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerIndex,
    PdfPageIndex,
};

use assetdesk_core::config::PdfExportConfig;
use assetdesk_core::result::AppResult;
use assetdesk_entity::report::Row;

use super::{ExportColumn, TableWriter, cell_text, write_error};

const MARGIN_MM: f32 = 12.0;
const TITLE_SIZE: f32 = 14.0;
const HEADER_SIZE: f32 = 9.0;
const BODY_SIZE: f32 = 8.0;
const FOOTER_SIZE: f32 = 8.0;
const LINE_MM: f32 = 5.0;
const LAYER: &str = "Table";
/// Average Helvetica glyph width as a fraction of the font size.
const GLYPH_WIDTH: f32 = 0.5;
const PT_TO_MM: f32 = 0.3528;

/// Paginated table with title header and page footers.
#[derive(Debug, Clone, Default)]
pub struct PdfTableWriter {
    config: PdfExportConfig,
}

impl PdfTableWriter {
    /// Creates a writer with the given page setup.
    pub fn new(config: PdfExportConfig) -> Self {
        Self { config }
    }
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

struct Layout {
    width: f32,
    height: f32,
    column_width: f32,
    max_chars: usize,
    first_row_y: f32,
    last_row_y: f32,
}

impl Layout {
    fn new(width: f32, height: f32, columns: usize) -> Self {
        let usable = width - 2.0 * MARGIN_MM;
        let column_width = usable / columns.max(1) as f32;
        let glyph_mm = BODY_SIZE * GLYPH_WIDTH * PT_TO_MM;
        Self {
            width,
            height,
            column_width,
            max_chars: ((column_width - 1.0) / glyph_mm).max(3.0) as usize,
            first_row_y: height - MARGIN_MM - 2.0 * LINE_MM - 4.0,
            last_row_y: MARGIN_MM + LINE_MM,
        }
    }

    #[cfg(test)]
    fn rows_per_page(&self) -> usize {
        ((self.first_row_y - self.last_row_y) / LINE_MM) as usize + 1
    }
}

impl TableWriter for PdfTableWriter {
    fn write(
        &self,
        rows: &mut dyn Iterator<Item = AppResult<Row>>,
        columns: &[ExportColumn],
        title: &str,
        out: &Path,
    ) -> AppResult<u64> {
        let (width, height) = self.config.page_size_mm();
        let layout = Layout::new(width, height, columns.len());

        let (doc, first_page, first_layer) = PdfDocument::new(title, Mm(width), Mm(height), LAYER);
        let fonts = Fonts {
            regular: doc
                .add_builtin_font(BuiltinFont::Helvetica)
                .map_err(|e| write_error("PDF", e))?,
            bold: doc
                .add_builtin_font(BuiltinFont::HelveticaBold)
                .map_err(|e| write_error("PDF", e))?,
        };

        let mut pages = vec![(first_page, first_layer)];
        draw_page_header(&doc, first_page, first_layer, &layout, &fonts, columns, title);
        let mut y = layout.first_row_y;
        let mut count = 0u64;

        for row in rows {
            let row = row?;
            if y < layout.last_row_y {
                let (page, layer) = doc.add_page(Mm(width), Mm(height), LAYER);
                draw_page_header(&doc, page, layer, &layout, &fonts, columns, title);
                pages.push((page, layer));
                y = layout.first_row_y;
            }
            let (page, layer) = pages[pages.len() - 1];
            let current = doc.get_page(page).get_layer(layer);
            for (i, column) in columns.iter().enumerate() {
                let text = truncate(&cell_text(row.get(&column.name)), layout.max_chars);
                if !text.is_empty() {
                    current.use_text(
                        text,
                        BODY_SIZE,
                        Mm(MARGIN_MM + i as f32 * layout.column_width),
                        Mm(y),
                        &fonts.regular,
                    );
                }
            }
            y -= LINE_MM;
            count += 1;
        }

        if count == 0 {
            let current = doc.get_page(first_page).get_layer(first_layer);
            current.use_text(
                "No data",
                BODY_SIZE,
                Mm(MARGIN_MM),
                Mm(layout.first_row_y),
                &fonts.regular,
            );
        }

        let total = pages.len();
        for (n, (page, layer)) in pages.iter().enumerate() {
            let footer = format!("Page {} of {}", n + 1, total);
            let footer_width = footer.len() as f32 * FOOTER_SIZE * GLYPH_WIDTH * PT_TO_MM;
            let x = (layout.width - footer_width) / 2.0;
            doc.get_page(*page)
                .get_layer(*layer)
                .use_text(footer, FOOTER_SIZE, Mm(x), Mm(MARGIN_MM / 2.0), &fonts.regular);
        }

        let file = File::create(out)?;
        doc.save(&mut BufWriter::new(file))
            .map_err(|e| write_error("PDF", e))?;
        Ok(count)
    }
}

fn draw_page_header(
    doc: &PdfDocumentReference,
    page: PdfPageIndex,
    layer: PdfLayerIndex,
    layout: &Layout,
    fonts: &Fonts,
    columns: &[ExportColumn],
    title: &str,
) {
    let current = doc.get_page(page).get_layer(layer);
    let title_y = layout.height - MARGIN_MM;
    current.use_text(title, TITLE_SIZE, Mm(MARGIN_MM), Mm(title_y), &fonts.bold);

    let header_y = title_y - 2.0 * LINE_MM;
    for (i, column) in columns.iter().enumerate() {
        current.use_text(
            truncate(&column.label, layout.max_chars),
            HEADER_SIZE,
            Mm(MARGIN_MM + i as f32 * layout.column_width),
            Mm(header_y),
            &fonts.bold,
        );
    }
}

/// Cut `text` to at most `max` characters, single line.
fn truncate(text: &str, max: usize) -> String {
    let flat: String = text
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    if flat.chars().count() <= max {
        return flat;
    }
    let keep = max.saturating_sub(3);
    let mut out: String = flat.chars().take(keep).collect();
    out.push_str("...");
    out
}
