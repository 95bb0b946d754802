use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, bail};
use regex::{Captures, Regex};

use super::types::{DecodedPage, TextRun};

pub trait PageDecoder {
    fn decode(&self, pdf_path: &Path) -> Result<Vec<DecodedPage>>;
}

#[derive(Debug)]
pub struct PdfToHtmlDecoder {
    max_pages: Option<usize>,
    page_regex: Regex,
    text_regex: Regex,
    attribute_regex: Regex,
    markup_regex: Regex,
    entity_regex: Regex,
}

impl PdfToHtmlDecoder {
    pub fn new(max_pages: Option<usize>) -> Result<Self> {
        Ok(Self {
            max_pages,
            page_regex: Regex::new(r#"(?s)<page\b[^>]*\bnumber="(\d+)"[^>]*>(.*?)</page>"#)
                .context("failed to compile pdftohtml page regex")?,
            text_regex: Regex::new(r"(?s)<text\b([^>]*)>(.*?)</text>")
                .context("failed to compile pdftohtml text regex")?,
            attribute_regex: Regex::new(r#"\b(top|left)="(-?\d+(?:\.\d+)?)""#)
                .context("failed to compile pdftohtml attribute regex")?,
            markup_regex: Regex::new(r"<[^>]+>").context("failed to compile markup regex")?,
            entity_regex: Regex::new(r"&(?:#[xX]([0-9a-fA-F]+)|#([0-9]+)|(amp|lt|gt|quot|apos));")
                .context("failed to compile entity regex")?,
        })
    }

    pub fn parse_xml(&self, xml: &str) -> Vec<DecodedPage> {
        self.page_regex
            .captures_iter(xml)
            .enumerate()
            .map(|(index, page)| {
                let number = page
                    .get(1)
                    .and_then(|value| value.as_str().parse::<usize>().ok())
                    .unwrap_or(index + 1);
                let body = page.get(2).map(|value| value.as_str()).unwrap_or_default();

                DecodedPage {
                    number,
                    runs: self.parse_runs(body),
                }
            })
            .collect()
    }

    fn parse_runs(&self, page_body: &str) -> Vec<TextRun> {
        let mut runs = Vec::new();

        for element in self.text_regex.captures_iter(page_body) {
            let attributes = element.get(1).map(|value| value.as_str()).unwrap_or_default();
            let mut top = None;
            let mut left = None;
            for attribute in self.attribute_regex.captures_iter(attributes) {
                let value = attribute
                    .get(2)
                    .and_then(|value| value.as_str().parse::<f64>().ok());
                match attribute.get(1).map(|name| name.as_str()) {
                    Some("top") => top = value,
                    Some("left") => left = value,
                    _ => {}
                }
            }

            let (Some(y), Some(x)) = (top, left) else {
                continue;
            };

            let inner = element.get(2).map(|value| value.as_str()).unwrap_or_default();
            let text = self.decode_entities(&self.markup_regex.replace_all(inner, ""));
            runs.push(TextRun::new(text, x, y));
        }

        runs
    }

    fn decode_entities(&self, raw: &str) -> String {
        self.entity_regex
            .replace_all(raw, |entity: &Captures| {
                let decoded = if let Some(hex) = entity.get(1) {
                    u32::from_str_radix(hex.as_str(), 16)
                        .ok()
                        .and_then(char::from_u32)
                } else if let Some(decimal) = entity.get(2) {
                    decimal.as_str().parse::<u32>().ok().and_then(char::from_u32)
                } else {
                    match entity.get(3).map(|name| name.as_str()) {
                        Some("amp") => Some('&'),
                        Some("lt") => Some('<'),
                        Some("gt") => Some('>'),
                        Some("quot") => Some('"'),
                        Some("apos") => Some('\''),
                        _ => None,
                    }
                };

                decoded
                    .map(|character| character.to_string())
                    .unwrap_or_else(|| entity[0].to_string())
            })
            .replace('\u{00a0}', " ")
    }
}

impl PageDecoder for PdfToHtmlDecoder {
    fn decode(&self, pdf_path: &Path) -> Result<Vec<DecodedPage>> {
        let mut command = Command::new("pdftohtml");
        command
            .arg("-xml")
            .arg("-i")
            .arg("-q")
            .arg("-nomerge")
            .arg("-enc")
            .arg("UTF-8")
            .arg("-f")
            .arg("1");
        if let Some(max_pages) = self.max_pages {
            command.arg("-l").arg(max_pages.to_string());
        }
        command.arg("-stdout").arg(pdf_path);

        let output = command
            .output()
            .with_context(|| format!("failed to execute pdftohtml for {}", pdf_path.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "pdftohtml returned non-zero exit status for {}: {}",
                pdf_path.display(),
                stderr.trim()
            );
        }

        let xml = String::from_utf8_lossy(&output.stdout);
        Ok(self.parse_xml(&xml))
    }
}

pub fn decoder_version() -> Option<String> {
    let output = Command::new("pdftohtml").arg("-v").output().ok()?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let source = if stdout.trim().is_empty() {
        stderr.trim()
    } else {
        stdout.trim()
    };

    source
        .lines()
        .next()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| line.to_string())
}
