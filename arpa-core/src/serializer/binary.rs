//! Binary mirror (spec §4.9): a length-prefixed little-endian stream of
//! `seq_entry = (idw, case_mask, oc, dc, weight, backoff)`, one record per
//! stored n-gram. `arpa_only` mode drops `oc`/`dc` to shrink a model destined
//! only for ARPA export.

use std::io::{self, Read, Write};

use byteorder::{ReadBytesExt, WriteBytesExt, LE};

use crate::error::{ArpaError, Result};
use crate::node::NodeIdx;
use crate::options::Options;
use crate::trie::{Trie, ROOT};
use crate::wordid::WordId;

struct Record {
    path: Vec<WordId>,
    case: u32,
    oc: u64,
    dc: u64,
    weight: f64,
    backoff: f64,
}

fn collect_records(trie: &Trie, node: NodeIdx, path: &mut Vec<WordId>, out: &mut Vec<Record>) {
    for (id, child) in trie.children_sorted(node) {
        path.push(id);
        if trie.is_word(child) {
            let n = trie.node(child);
            out.push(Record {
                path: path.clone(),
                case: n.dominant_case(),
                oc: n.oc,
                dc: n.dc,
                weight: n.weight,
                backoff: n.backoff,
            });
        }
        collect_records(trie, child, path, out);
        path.pop();
    }
}

fn write_record(w: &mut impl Write, rec: &Record, arpa_only: bool) -> io::Result<()> {
    w.write_u16::<LE>(rec.path.len() as u16)?;
    for &id in &rec.path {
        w.write_u32::<LE>(id)?;
    }
    w.write_u32::<LE>(rec.case)?;
    if !arpa_only {
        w.write_u64::<LE>(rec.oc)?;
        w.write_u64::<LE>(rec.dc)?;
    }
    w.write_f64::<LE>(rec.weight)?;
    w.write_f64::<LE>(rec.backoff)?;
    Ok(())
}

/// Serialises `trie` to the binary mirror format. Drops `oc`/`dc` when
/// `arpa_only` is set.
pub fn dump_bin(trie: &Trie, arpa_only: bool) -> Result<Vec<u8>> {
    let mut records = Vec::new();
    collect_records(trie, ROOT, &mut Vec::new(), &mut records);

    let mut buf = Vec::new();
    buf.write_u8(trie.order())
        .and_then(|_| buf.write_u32::<LE>(trie.options().bits()))
        .and_then(|_| buf.write_u32::<LE>(arpa_only as u32))
        .and_then(|_| buf.write_u32::<LE>(records.len() as u32))
        .map_err(|e| ArpaError::Fatal(format!("binary header write failed: {e}")))?;
    for rec in &records {
        write_record(&mut buf, rec, arpa_only)
            .map_err(|e| ArpaError::Fatal(format!("binary record write failed: {e}")))?;
    }
    Ok(buf)
}

fn read_record(r: &mut impl Read, arpa_only: bool) -> io::Result<Record> {
    let len = r.read_u16::<LE>()? as usize;
    let mut path = Vec::with_capacity(len);
    for _ in 0..len {
        path.push(r.read_u32::<LE>()?);
    }
    let case = r.read_u32::<LE>()?;
    let (oc, dc) = if arpa_only { (0, 0) } else { (r.read_u64::<LE>()?, r.read_u64::<LE>()?) };
    let weight = r.read_f64::<LE>()?;
    let backoff = r.read_f64::<LE>()?;
    Ok(Record { path, case, oc, dc, weight, backoff })
}

/// Reconstructs a [`Trie`] from bytes produced by [`dump_bin`].
pub fn load_bin(bytes: &[u8]) -> Result<Trie> {
    let mut cursor = io::Cursor::new(bytes);
    let order = cursor.read_u8().map_err(|e| ArpaError::Input(format!("truncated header: {e}")))?;
    let option_bits =
        cursor.read_u32::<LE>().map_err(|e| ArpaError::Input(format!("truncated header: {e}")))?;
    let arpa_only =
        cursor.read_u32::<LE>().map_err(|e| ArpaError::Input(format!("truncated header: {e}")))? != 0;
    let count =
        cursor.read_u32::<LE>().map_err(|e| ArpaError::Input(format!("truncated header: {e}")))?;

    let mut trie = Trie::new(order);
    trie.set_options(Options::from_bits(option_bits));
    for _ in 0..count {
        let rec = read_record(&mut cursor, arpa_only)
            .map_err(|e| ArpaError::Input(format!("truncated or malformed record: {e}")))?;
        trie.insert_arpa(&rec.path, rec.weight, rec.backoff)?;
        if !arpa_only {
            if let Some(idx) = trie.find_path(&rec.path) {
                trie.node_mut(idx).oc = rec.oc;
                trie.node_mut(idx).dc = rec.dc;
                trie.node_mut(idx).bump_case(rec.case, 1);
            }
        }
    }
    Ok(trie)
}
