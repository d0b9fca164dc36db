use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use rusty_bridge::{write_binary, write_delimited, Table};

const WORDS: &[&str] = &[
    "chisme", "algo", "cosa", "trasto", "ciudad", "provincia", "region", "archivo",
];

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next_u64() % n as u64) as usize
    }
}

/// A word with each letter's case picked at random.
fn mixed_case(word: &str, rng: &mut SimpleRng) -> String {
    word.chars()
        .map(|c| {
            if rng.below(2) == 0 {
                c.to_ascii_uppercase()
            } else {
                c
            }
        })
        .collect()
}

fn write_parquet(path: &Path, table: &Table) -> Result<()> {
    let width = table.width();
    let fields: Vec<Field> = (0..width)
        .map(|i| Field::new(format!("c{i}"), DataType::Utf8, true))
        .collect();
    let schema = Arc::new(Schema::new(fields));

    let columns: Vec<ArrayRef> = (0..width)
        .map(|i| {
            let values: Vec<Option<&str>> = table
                .rows()
                .iter()
                .map(|row| row.get(i).map(String::as_str))
                .collect();
            Arc::new(StringArray::from(values)) as ArrayRef
        })
        .collect();

    let batch =
        RecordBatch::try_new(schema.clone(), columns).context("building record batch")?;
    let file = std::fs::File::create(path).context("creating parquet file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing record batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);

    let rows = 12;
    let width = 3;
    let table: Table = (0..rows)
        .map(|_| {
            (0..width)
                .map(|_| mixed_case(WORDS[rng.below(WORDS.len())], &mut rng))
                .collect::<Vec<_>>()
        })
        .collect();

    write_delimited(Path::new("sample_data.csv"), &table, b',')?;
    write_delimited(Path::new("sample_data.tsv"), &table, b'\t')?;
    write_binary(Path::new("sample_data.pckl"), &table)?;

    let lines: Vec<String> = table.rows().iter().map(|row| row.join(" ")).collect();
    std::fs::write("sample_data.txt", lines.join("\n") + "\n")
        .context("writing sample_data.txt")?;

    let json = serde_json::to_string_pretty(&table).context("encoding JSON")?;
    std::fs::write("sample_data.json", json).context("writing sample_data.json")?;

    write_parquet(Path::new("sample_data.parquet"), &table)?;

    println!("Wrote {rows} rows ({width} fields each) as sample_data.{{csv,tsv,txt,pckl,json,parquet}}");
    Ok(())
}
