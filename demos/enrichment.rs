use std::{fs, process};

use dbbact::annotations::FastAnnotations;
use dbbact::{
    Annotation, AnnotationStore, AnnotationType, Context, EnrichmentReport, PermutationTest,
    Sequence, TermType,
};

/// Reads one sequence per line
fn read_sequences(path: &str) -> Vec<Sequence> {
    fs::read_to_string(path)
        .expect("unable to read sequence file")
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| Sequence::try_from(line).expect("invalid sequence"))
        .collect()
}

/// A unique 12 bp sequence for every index
fn synthetic_sequence(idx: usize) -> Sequence {
    let bases = ['A', 'C', 'G', 'T'];
    let s: String = (0..12).map(|pos| bases[(idx >> (2 * pos)) % 4]).collect();
    Sequence::try_from(s.as_str()).unwrap()
}

/// 20 foreground sequences from feces, 30 background sequences from saliva,
/// all of them from humans
fn synthetic_data() -> (Vec<Sequence>, Vec<Sequence>, AnnotationStore) {
    let fg: Vec<Sequence> = (0..20).map(synthetic_sequence).collect();
    let bg: Vec<Sequence> = (20..50).map(synthetic_sequence).collect();

    let mut store = AnnotationStore::new();
    let mut feces = Annotation::new(1u32.into(), AnnotationType::Common);
    feces.add_detail(Context::All, "feces");
    store.insert(feces);

    let mut diff = Annotation::new(2u32.into(), AnnotationType::DiffExp);
    diff.add_detail(Context::High, "saliva");
    diff.add_detail(Context::Low, "feces");
    diff.add_detail(Context::All, "homo sapiens");
    store.insert(diff);

    let mut human = Annotation::new(3u32.into(), AnnotationType::Other);
    human.add_detail(Context::All, "homo sapiens");
    store.insert(human);

    for (idx, seq) in fg.iter().enumerate() {
        if idx % 4 != 0 {
            store.link(seq.clone(), 1u32.into());
        }
        store.link(seq.clone(), 3u32.into());
    }
    for (idx, seq) in bg.iter().enumerate() {
        if idx % 3 != 0 {
            store.link(seq.clone(), 2u32.into());
        }
        store.link(seq.clone(), 3u32.into());
    }
    (fg, bg, store)
}

fn main() {
    simple_logger::init_with_env().unwrap();

    let args: Vec<String> = std::env::args().collect();
    let (fg, bg, store, term_type) = match args.len() {
        1 => {
            let (fg, bg, store) = synthetic_data();
            (fg, bg, store, TermType::Term)
        }
        4 | 5 => {
            let fg = read_sequences(&args[2]);
            let bg = read_sequences(&args[3]);
            let all: Vec<Sequence> = fg.iter().chain(&bg).cloned().collect();
            let json = fs::read_to_string(&args[1]).expect("unable to read annotations");
            let payload: FastAnnotations =
                serde_json::from_str(&json).expect("invalid annotation file");
            let store = payload.into_store(&all).expect("invalid annotations");
            let term_type = args
                .get(4)
                .map_or(Ok(TermType::Term), |arg| arg.parse::<TermType>())
                .unwrap_or_else(|err| {
                    println!("{err}");
                    process::exit(1)
                });
            (fg, bg, store, term_type)
        }
        _ => {
            println!("Calculate the term enrichment of two groups of sequences\n\n");
            println!("Usage\nenrichment <ANNOTATIONS.json> <FG.txt> <BG.txt> [term|annotation]");
            println!("\nANNOTATIONS.json is the response of the dbBact sequences/get_fast_annotations");
            println!("endpoint for all foreground, followed by all background sequences.");
            println!("\nWithout arguments a synthetic dataset is used.");
            process::exit(1)
        }
    };

    let test = PermutationTest::default();
    let report = EnrichmentReport::from(dbbact::enrichment(&fg, &bg, &store, term_type, &test));

    if !report.is_ok() {
        println!("Error: {}", report.error());
        process::exit(1)
    }
    if let (Some(terms), Some(pvalues), Some(effects)) =
        (report.terms(), report.p_values(), report.effect_sizes())
    {
        println!("term\tp-value\teffect size");
        for ((term, pvalue), effect) in terms.iter().zip(pvalues).zip(effects) {
            println!("{term}\t{pvalue:e}\t{effect:.3}");
        }
    }
}
