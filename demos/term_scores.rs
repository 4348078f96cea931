use dbbact::client::{AnnotationSource, LocalDatabase, OntologySource};
use dbbact::scores::{
    experiment_term_counts, group_term_scores, relative_term_frequencies, term_scores,
    ScoreMethod,
};
use dbbact::{
    Annotation, AnnotationType, Context, Sequence, TermScorer, DEFAULT_MIN_TERM_ANNOTATIONS,
};

fn sequence(s: &str) -> Sequence {
    Sequence::try_from(s).unwrap()
}

fn add(
    db: &mut LocalDatabase,
    id: u32,
    kind: AnnotationType,
    details: &[(Context, &str)],
    seqs: &[Sequence],
) {
    let mut annotation = Annotation::new(id.into(), kind);
    // ten annotations per experiment
    annotation.set_experiment_id(id / 10);
    for (context, term) in details {
        annotation.add_detail(context.clone(), *term);
    }
    db.add_annotation(annotation, seqs);
}

/// A small database of fecal and oral sequences
fn database() -> LocalDatabase {
    let mut db = LocalDatabase::new();
    let gut = [sequence("TACGGAGGATCC"), sequence("TACGTAGGGTGC")];
    let oral = [sequence("TACGGAGGGTGC"), sequence("TACGTAGGGGGC")];

    for experiment in 1..=3 {
        let id = experiment * 10;
        add(&mut db, id, AnnotationType::Common, &[(Context::All, "feces")], &gut);
        add(&mut db, id + 1, AnnotationType::Common, &[(Context::All, "saliva")], &oral);
        add(
            &mut db,
            id + 2,
            AnnotationType::DiffExp,
            &[(Context::High, "human feces"), (Context::Low, "saliva")],
            &gut[..1],
        );
        add(
            &mut db,
            id + 3,
            AnnotationType::DiffExp,
            &[(Context::High, "saliva"), (Context::Low, "feces")],
            &oral,
        );
    }
    add(&mut db, 40, AnnotationType::Contamination, &[], &oral[1..]);

    db.add_child("feces", "human feces");
    db.set_taxonomy(gut[0].clone(), "k__Bacteria;p__Bacteroidetes;g__Bacteroides");
    db.set_taxonomy(oral[0].clone(), "k__Bacteria;p__Firmicutes;g__Streptococcus");
    db
}

fn main() {
    simple_logger::init_with_env().unwrap();
    let db = database();

    let term = std::env::args().nth(1).unwrap_or_else(|| "feces".to_string());
    match TermScorer::default().score_term_from_source(&term, &db, &db, &db) {
        Ok(res) => {
            let buckets = [("high", res.high()), ("low", res.low()), ("common", res.common())];
            for (name, bucket) in buckets {
                println!("### {} in {} ###", name, res.term());
                for seq in bucket {
                    println!("{}\t{}\t{:.4}", seq.sequence(), seq.taxonomy(), seq.score());
                }
            }
        }
        Err(err) => println!("Error: {err}"),
    }

    let sequences: Vec<Sequence> = db.store().sequences().cloned().collect();
    let store = db.fast_annotations(&sequences).unwrap();
    let all_terms: Vec<String> = term_scores(store.annotations(), ScoreMethod::Sum)
        .into_iter()
        .map(|(term, _)| term.into())
        .collect();
    let term_info = db.term_stats(&all_terms).unwrap();

    println!("\n### terms per sequence ###");
    for seq in &sequences {
        let terms: Vec<String> = store
            .sequence_terms(seq)
            .unwrap()
            .into_iter()
            .map(|term| term.to_string())
            .collect();
        println!("{}\t{}", seq, terms.join(";"));
    }

    println!("\n### group scores ###");
    for (term, score) in group_term_scores(&store, &sequences, &term_info).unwrap() {
        println!("{term}\t{score:.4}");
    }

    let counts = experiment_term_counts(store.annotations());
    let experiment_mean = term_scores(store.annotations(), ScoreMethod::ExperimentMean(&counts));
    println!("\n### experiment mean scores ###");
    for (term, score) in &experiment_mean {
        println!("{term}\t{score:.4}");
    }

    println!("\n### relative term frequencies ###");
    let freqs =
        relative_term_frequencies(&experiment_mean, &term_info, DEFAULT_MIN_TERM_ANNOTATIONS);
    for (term, freq) in freqs {
        println!("{term}\t{freq:.4}");
    }
}
