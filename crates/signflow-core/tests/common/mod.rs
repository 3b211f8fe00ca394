#![allow(dead_code)]

use std::io::Cursor;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine};
use image::{ImageFormat, Rgba, RgbaImage};
use lopdf::{dictionary, Dictionary, Document, Object, Stream};

/// Letter-sized PDF with `num_pages` pages, each labelled `<prefix>-Page-<n>`.
pub fn create_test_pdf(num_pages: u32, prefix: &str) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });

    let mut kids = Vec::new();
    for n in 0..num_pages {
        let content = format!("BT /F1 12 Tf 72 720 Td ({}-Page-{}) Tj ET", prefix, n + 1);
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => num_pages as i64,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

pub fn png_data_url(width: u32, height: u32, pixel: [u8; 4]) -> String {
    let img = RgbaImage::from_pixel(width, height, Rgba(pixel));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    format!("data:image/png;base64,{}", STANDARD.encode(out.into_inner()))
}

/// Write an executable shell script standing in for `soffice`.
#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Parses the converter arguments and writes `<stem>.<ext>` into the output
/// directory. HTML is written with the legacy `.htm` extension; other formats
/// get a copy of the input.
pub const FAKE_SOFFICE: &str = r#"
fmt=""
out=""
input=""
while [ $# -gt 0 ]; do
  case "$1" in
    --convert-to) fmt="$2"; shift 2 ;;
    --outdir) out="$2"; shift 2 ;;
    --*) shift ;;
    *) input="$1"; shift ;;
  esac
done
name=$(basename "$input")
base="${name%.*}"
echo "convert $input -> $out/$base.$fmt"
if [ "$fmt" = "html" ]; then
  printf '<html><head><style>p{margin:0}</style></head><body><p>%s</p><p style="page-break-before: always">second</p></body></html>' "$base" > "$out/$base.htm"
else
  cp "$input" "$out/$base.$fmt"
fi
"#;

pub const FAILING_SOFFICE: &str = r#"
echo "source file could not be loaded"
echo "general error" >&2
echo "giving up"
exit 3
"#;

/// Exits cleanly without producing anything.
pub const SILENT_SOFFICE: &str = "exit 0\n";
