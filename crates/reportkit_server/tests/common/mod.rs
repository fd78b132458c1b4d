use std::collections::BTreeMap;
use std::io::{Cursor, Read};

use quick_xml::Reader;
use quick_xml::events::Event;
use zip::ZipArchive;

/// Read the first worksheet of an `.xlsx` payload back as a text grid.
///
/// Shared strings are resolved, booleans render as `TRUE`/`FALSE`, numbers
/// as their stored text. Blank cells are `""`.
pub fn read_xlsx_text_grid(bytes: &[u8]) -> Vec<Vec<String>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();

    let l_shared = match archive.by_name("xl/sharedStrings.xml") {
        Ok(mut entry) => {
            let mut xml = String::new();
            entry.read_to_string(&mut xml).unwrap();
            read_shared_strings(&xml)
        }
        Err(_) => vec![],
    };

    let mut xml = String::new();
    archive
        .by_name("xl/worksheets/sheet1.xml")
        .unwrap()
        .read_to_string(&mut xml)
        .unwrap();

    let mut dict_cells: BTreeMap<(usize, usize), String> = BTreeMap::new();
    let mut reader = Reader::from_str(&xml);
    let mut cell_ref: Option<((usize, usize), String)> = None;
    let mut if_in_value = false;
    loop {
        match reader.read_event().unwrap() {
            Event::Start(e) if e.name().as_ref() == b"c" => {
                let mut pos = (0, 0);
                let mut c_type = String::new();
                for attr in e.attributes() {
                    let attr = attr.unwrap();
                    match attr.key.as_ref() {
                        b"r" => pos = parse_cell_ref(&String::from_utf8_lossy(&attr.value)),
                        b"t" => c_type = String::from_utf8_lossy(&attr.value).to_string(),
                        _ => {}
                    }
                }
                cell_ref = Some((pos, c_type));
            }
            Event::Start(e) if e.name().as_ref() == b"v" => if_in_value = true,
            Event::Text(t) if if_in_value => {
                let c_raw = String::from_utf8_lossy(&t).to_string();
                if let Some((pos, c_type)) = &cell_ref {
                    let c_text = match (c_type.as_str(), c_raw.as_str()) {
                        ("s", _) => l_shared[c_raw.parse::<usize>().unwrap()].clone(),
                        ("b", "1") => "TRUE".to_string(),
                        ("b", _) => "FALSE".to_string(),
                        _ => c_raw,
                    };
                    dict_cells.insert(*pos, c_text);
                }
            }
            Event::End(e) if e.name().as_ref() == b"v" => if_in_value = false,
            Event::End(e) if e.name().as_ref() == b"c" => cell_ref = None,
            Event::Eof => break,
            _ => {}
        }
    }

    let n_rows = dict_cells.keys().map(|(r, _)| r + 1).max().unwrap_or(0);
    let n_cols = dict_cells.keys().map(|(_, c)| c + 1).max().unwrap_or(0);
    let mut l_grid = vec![vec![String::new(); n_cols]; n_rows];
    for ((r, c), text) in dict_cells {
        l_grid[r][c] = text;
    }
    l_grid
}

fn read_shared_strings(xml: &str) -> Vec<String> {
    let mut reader = Reader::from_str(xml);
    let mut l_strings = Vec::new();
    let mut if_in_text = false;
    loop {
        match reader.read_event().unwrap() {
            Event::Start(e) if e.name().as_ref() == b"si" => l_strings.push(String::new()),
            Event::Start(e) if e.name().as_ref() == b"t" => if_in_text = true,
            Event::Text(t) if if_in_text => {
                if let Some(last) = l_strings.last_mut() {
                    last.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Event::End(e) if e.name().as_ref() == b"t" => if_in_text = false,
            Event::Eof => break,
            _ => {}
        }
    }
    l_strings
}

fn parse_cell_ref(cell_ref: &str) -> (usize, usize) {
    let n_split = cell_ref.find(|c: char| c.is_ascii_digit()).unwrap();
    let (c_letters, c_digits) = cell_ref.split_at(n_split);
    let n_col = c_letters
        .bytes()
        .fold(0usize, |acc, b| acc * 26 + (b - b'A' + 1) as usize)
        - 1;
    (c_digits.parse::<usize>().unwrap() - 1, n_col)
}
