//! Document fixtures synthesised in memory for integration tests.

#![allow(dead_code)]

use std::io::{Cursor, Write};

use lopdf::{dictionary, Document, Object, StringFormat};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Zip `parts` (name, content) into an archive.
pub fn zip_bytes(parts: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in parts {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .expect("start zip entry");
        writer.write_all(content.as_bytes()).expect("write zip entry");
    }
    writer.finish().expect("finish zip").into_inner()
}

pub fn core_xml(creator: &str, last_modified_by: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <dc:title>Quarterly memo</dc:title>
  <dc:creator>{creator}</dc:creator>
  <cp:lastModifiedBy>{last_modified_by}</cp:lastModifiedBy>
  <dcterms:created xsi:type="dcterms:W3CDTF">2023-01-14T09:30:00Z</dcterms:created>
  <dcterms:modified xsi:type="dcterms:W3CDTF">2023-02-01T17:05:00Z</dcterms:modified>
</cp:coreProperties>"#
    )
}

pub fn app_xml(application: &str, template: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties">
  <Template>{template}</Template>
  <Application>{application}</Application>
  <AppVersion>16.0000</AppVersion>
</Properties>"#
    )
}

pub fn docx_bytes(creator: &str, last_modified_by: &str, body: &str) -> Vec<u8> {
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body><w:p><w:r><w:t>{body}</w:t></w:r></w:p></w:body>
</w:document>"#
    );
    zip_bytes(&[
        ("[Content_Types].xml", "<Types/>"),
        ("word/document.xml", &document),
        ("docProps/core.xml", &core_xml(creator, last_modified_by)),
        (
            "docProps/app.xml",
            &app_xml("Microsoft Office Word", "Normal.dotm"),
        ),
    ])
}

fn literal(s: &str) -> Object {
    Object::String(s.as_bytes().to_vec(), StringFormat::Literal)
}

/// Pages tree and catalog for a one-page document.
fn add_single_page(doc: &mut Document) {
    let pages_id = doc.new_object_id();
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
}

fn save(mut doc: Document) -> Vec<u8> {
    let mut out = Vec::new();
    doc.save_to(&mut out).expect("serialise pdf");
    out
}

/// A one-page PDF whose Info dictionary carries the given author and producer.
pub fn pdf_bytes(author: &str, producer: &str) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    add_single_page(&mut doc);
    let info_id = doc.add_object(dictionary! {
        "Author" => literal(author),
        "Producer" => literal(producer),
        "CreationDate" => literal("D:20230114093000Z"),
    });
    doc.trailer.set("Info", info_id);
    save(doc)
}

const PASSWORD_PAD: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01, 0x08,
    0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53, 0x69, 0x7A,
];

fn padded(password: &str) -> Vec<u8> {
    password
        .bytes()
        .chain(PASSWORD_PAD)
        .take(32)
        .collect()
}

fn rc4(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut s: Vec<u8> = (0..=255).collect();
    let mut j: u8 = 0;
    for i in 0..256 {
        j = j.wrapping_add(s[i]).wrapping_add(key[i % key.len()]);
        s.swap(i, j as usize);
    }
    let (mut i, mut j) = (0u8, 0u8);
    data.iter()
        .map(|byte| {
            i = i.wrapping_add(1);
            j = j.wrapping_add(s[i as usize]);
            s.swap(i as usize, j as usize);
            byte ^ s[s[i as usize].wrapping_add(s[j as usize]) as usize]
        })
        .collect()
}

fn encrypted(key: &[u8], id: (u32, u16), text: &str) -> Object {
    let mut seed = key.to_vec();
    seed.extend_from_slice(&id.0.to_le_bytes()[..3]);
    seed.extend_from_slice(&id.1.to_le_bytes());
    let object_key = &md5::compute(&seed).0[..key.len() + 5];
    Object::String(rc4(object_key, text.as_bytes()), StringFormat::Hexadecimal)
}

/// Like [`pdf_bytes`], but protected with the 40-bit RC4 standard security
/// handler. An empty `user_password` leaves the file readable without one.
pub fn encrypted_pdf_bytes(author: &str, user_password: &str) -> Vec<u8> {
    let file_id = b"metaharvest-test".to_vec();
    let permissions: i32 = -4;

    let owner_key = &md5::compute(padded("owner-secret")).0[..5];
    let owner_entry = rc4(owner_key, &padded(user_password));

    let mut seed = padded(user_password);
    seed.extend_from_slice(&owner_entry);
    seed.extend_from_slice(&permissions.to_le_bytes());
    seed.extend_from_slice(&file_id);
    let file_key = md5::compute(&seed).0[..5].to_vec();
    let user_entry = rc4(&file_key, &PASSWORD_PAD);

    let mut doc = Document::with_version("1.4");
    add_single_page(&mut doc);
    let info_id = doc.new_object_id();
    doc.objects.insert(
        info_id,
        Object::Dictionary(dictionary! {
            "Author" => encrypted(&file_key, info_id, author),
            "Producer" => encrypted(&file_key, info_id, "Acrobat Distiller 9.0"),
        }),
    );
    let encrypt_id = doc.add_object(dictionary! {
        "Filter" => "Standard",
        "V" => 1,
        "R" => 2,
        "O" => Object::String(owner_entry, StringFormat::Hexadecimal),
        "U" => Object::String(user_entry, StringFormat::Hexadecimal),
        "P" => permissions as i64,
    });
    doc.trailer.set("Info", info_id);
    doc.trailer.set("Encrypt", encrypt_id);
    doc.trailer.set(
        "ID",
        vec![
            Object::String(file_id.clone(), StringFormat::Hexadecimal),
            Object::String(file_id, StringFormat::Hexadecimal),
        ],
    );
    save(doc)
}

/// A property-set stream with a single section of LPSTR properties.
pub fn property_set(props: &[(u32, &str)]) -> Vec<u8> {
    const VT_LPSTR: u32 = 30;

    let mut values = Vec::new();
    for (id, text) in props {
        let mut bytes = text.as_bytes().to_vec();
        bytes.push(0);
        while bytes.len() % 4 != 0 {
            bytes.push(0);
        }
        let mut v = Vec::new();
        v.extend_from_slice(&VT_LPSTR.to_le_bytes());
        v.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
        v.extend_from_slice(&bytes);
        values.push((*id, v));
    }

    let mut offset = 8 + values.len() * 8;
    let mut index = Vec::new();
    for (id, v) in &values {
        index.extend_from_slice(&id.to_le_bytes());
        index.extend_from_slice(&(offset as u32).to_le_bytes());
        offset += v.len();
    }

    let mut out = Vec::new();
    out.extend_from_slice(&0xFFFEu16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&[0u8; 16]);
    out.extend_from_slice(&1u32.to_le_bytes());
    out.extend_from_slice(&[0u8; 16]);
    out.extend_from_slice(&48u32.to_le_bytes());
    out.extend_from_slice(&(offset as u32).to_le_bytes());
    out.extend_from_slice(&(values.len() as u32).to_le_bytes());
    out.extend_from_slice(&index);
    for (_, v) in &values {
        out.extend_from_slice(v);
    }
    out
}

/// A compound file holding the given SummaryInformation properties.
pub fn legacy_bytes(summary: &[(u32, &str)]) -> Vec<u8> {
    let mut compound =
        cfb::CompoundFile::create(Cursor::new(Vec::new())).expect("create compound file");
    {
        let mut stream = compound
            .create_stream("/\u{5}SummaryInformation")
            .expect("create stream");
        stream.write_all(&property_set(summary)).expect("write stream");
    }
    compound.flush().expect("flush compound file");
    compound.into_inner().into_inner()
}
