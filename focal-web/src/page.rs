//! HTML for the upload page and its results.
//!
//! Pages are plain server-rendered HTML. Images travel as `data:` URLs so a
//! request leaves nothing behind on the server once the response is sent.

use std::fmt::Write;

use base64::{Engine, engine::general_purpose::STANDARD};
use focal_core::{OutputSize, ProcessOptions, ProcessedImage, preset_by_name, standard_presets};
use focal_utils::OutputFormat;
use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};

pub const TITLE: &str = "Image Resizer with Object Detection";
pub const NO_DETECTIONS_MESSAGE: &str = "No objects detected in the uploaded image.";

/// Banner shown above the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Warning(String),
    Error(String),
}

/// The upload the next submission should re-use.
#[derive(Debug, Clone)]
pub struct CarriedUpload<'a> {
    pub file_name: &'a str,
    pub bytes: &'a [u8],
}

/// A successful result, ready for display.
#[derive(Debug, Clone)]
pub struct ResultView<'a> {
    pub processed: &'a ProcessedImage,
    /// PNG of the source with detections outlined, if it could be produced.
    pub annotated_png: Option<&'a [u8]>,
}

/// Everything that varies between renders of the page.
#[derive(Debug, Clone)]
pub struct PageView<'a> {
    pub options: &'a ProcessOptions,
    pub notice: Option<Notice>,
    pub result: Option<ResultView<'a>>,
    pub carried: Option<CarriedUpload<'a>>,
    /// Values to pre-fill; `None` falls back to the variant defaults.
    pub width: Option<String>,
    pub height: Option<String>,
    pub format: Option<OutputFormat>,
    /// Size preset chosen last time; `Custom` when absent.
    pub preset: Option<String>,
}

impl<'a> PageView<'a> {
    pub fn empty(options: &'a ProcessOptions) -> Self {
        Self {
            options,
            notice: None,
            result: None,
            carried: None,
            width: None,
            height: None,
            format: None,
            preset: None,
        }
    }
}

/// `data:` URL for `bytes`.
pub fn data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

pub fn render_page(view: &PageView<'_>) -> String {
    let mut html = String::with_capacity(4096);
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{title}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n<main>\n\
         <h1>{title}</h1>\n\
         <p>Upload an image, select an object, and resize it as per your preferences.</p>\n",
        title = text(TITLE),
    );

    match &view.notice {
        Some(Notice::Warning(message)) => {
            let _ = writeln!(
                html,
                "<div class=\"notice warning\" role=\"status\">{}</div>",
                text(message)
            );
        }
        Some(Notice::Error(message)) => {
            let _ = writeln!(
                html,
                "<div class=\"notice error\" role=\"alert\">{}</div>",
                text(message)
            );
        }
        None => {}
    }

    render_form(&mut html, view);

    if let Some(result) = &view.result {
        render_result(&mut html, result);
    }

    html.push_str("</main>\n</body>\n</html>\n");
    html
}

fn render_form(html: &mut String, view: &PageView<'_>) {
    let options = view.options;
    html.push_str("<form method=\"post\" action=\"/\" enctype=\"multipart/form-data\">\n");

    match &view.carried {
        Some(carried) => {
            let _ = writeln!(
                html,
                "<p class=\"current\">Current image: <strong>{}</strong></p>\n\
                 <input type=\"hidden\" name=\"source\" value=\"{}\">\n\
                 <input type=\"hidden\" name=\"filename\" value=\"{}\">\n\
                 <label>Replace image <input type=\"file\" name=\"file\" accept=\".png,.jpg,.jpeg,image/png,image/jpeg\"></label>",
                text(carried.file_name),
                STANDARD.encode(carried.bytes),
                attr(carried.file_name),
            );
        }
        None => {
            html.push_str(
                "<label>Upload an image <input type=\"file\" name=\"file\" \
                 accept=\".png,.jpg,.jpeg,image/png,image/jpeg\" required></label>\n",
            );
        }
    }

    if options.allows_selection()
        && let Some(result) = &view.result
    {
        html.push_str("<p>Detected objects:</p>\n<label>Select an object to resize: <select name=\"selection\">\n");
        for (index, choice) in result.processed.choices.iter().enumerate() {
            let selected = if index == result.processed.selected {
                " selected"
            } else {
                ""
            };
            let _ = writeln!(
                html,
                "<option value=\"{index}\"{selected}>{}</option>",
                text(choice)
            );
        }
        html.push_str("</select></label>\n");
    }

    if options.allows_custom_size() {
        let defaults = options.default_size();
        let width = view
            .width
            .clone()
            .unwrap_or_else(|| defaults.width().to_string());
        let height = view
            .height
            .clone()
            .unwrap_or_else(|| defaults.height().to_string());
        render_presets(html, view.preset.as_deref());
        let _ = writeln!(
            html,
            "<p>Customize resize dimensions:</p>\n\
             <label>Width (px) <input type=\"number\" name=\"width\" min=\"1\" value=\"{}\"></label>\n\
             <label>Height (px) <input type=\"number\" name=\"height\" min=\"1\" value=\"{}\"></label>",
            attr(&width),
            attr(&height),
        );
    } else {
        let _ = writeln!(
            html,
            "<p class=\"fixed\">Output size: {}</p>",
            describe_size(options.default_size())
        );
    }

    if options.allows_format_choice() {
        let chosen = view.format.unwrap_or_else(|| options.default_format());
        html.push_str("<fieldset><legend>Select download format:</legend>\n");
        for format in OutputFormat::ALL {
            let checked = if format == chosen { " checked" } else { "" };
            let _ = writeln!(
                html,
                "<label><input type=\"radio\" name=\"format\" value=\"{}\"{checked}> {}</label>",
                format.extension(),
                format.label()
            );
        }
        html.push_str("</fieldset>\n");
    }

    let button = if view.carried.is_some() {
        "Update"
    } else {
        "Detect and resize"
    };
    let _ = writeln!(html, "<button type=\"submit\">{button}</button>\n</form>");
}

/// Preset picker; a sized preset overrides the width/height inputs.
fn render_presets(html: &mut String, chosen: Option<&str>) {
    let chosen = chosen
        .and_then(preset_by_name)
        .map_or("Custom", |preset| preset.name);
    html.push_str("<label>Size preset <select name=\"preset\">\n");
    for preset in standard_presets() {
        let selected = if preset.name == chosen { " selected" } else { "" };
        let _ = writeln!(
            html,
            "<option value=\"{}\"{selected}>{}</option>",
            attr(&preset.name.to_ascii_lowercase()),
            text(preset.description)
        );
    }
    html.push_str("</select></label>\n");
}

fn render_result(html: &mut String, result: &ResultView<'_>) {
    let processed = result.processed;
    let output_url = data_url(processed.mime_type(), &processed.bytes);

    html.push_str("<section class=\"result\">\n");
    if let Some(png) = result.annotated_png {
        let _ = writeln!(
            html,
            "<figure><img src=\"{}\" alt=\"Detected objects\"><figcaption>Detected objects</figcaption></figure>",
            data_url(OutputFormat::Png.mime_type(), png)
        );
    }
    let _ = writeln!(
        html,
        "<figure><img src=\"{output_url}\" alt=\"Resized Image\"><figcaption>Resized Image ({}x{})</figcaption></figure>\n\
         <a class=\"download\" href=\"{output_url}\" download=\"{}\" type=\"{}\">Download Resized Image ({})</a>",
        processed.width,
        processed.height,
        attr(&processed.file_name),
        processed.mime_type(),
        processed.format.label(),
    );
    html.push_str("</section>\n");
}

fn describe_size(size: OutputSize) -> String {
    format!("{}×{} px", size.width(), size.height())
}

const STYLE: &str = "body{font-family:system-ui,sans-serif;margin:0;background:#f6f6f4;color:#222}\
main{max-width:860px;margin:0 auto;padding:2rem 1rem}\
form{display:flex;flex-direction:column;gap:.75rem;background:#fff;padding:1rem;border-radius:8px}\
fieldset{border:1px solid #ddd;border-radius:6px}\
.notice{padding:.75rem 1rem;border-radius:6px;margin-bottom:1rem}\
.warning{background:#fff4d6;border:1px solid #e8c35a}\
.error{background:#fde2e1;border:1px solid #e07a74}\
.result img{max-width:100%;border-radius:6px}\
.download{display:inline-block;margin-top:.5rem;padding:.5rem 1rem;background:#2f6fde;color:#fff;border-radius:6px;text-decoration:none}";
