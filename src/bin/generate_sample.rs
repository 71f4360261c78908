//! Writes `sample_registry.csv`, a registry-shaped fixture for manual
//! testing: one row per institution × campus × course, `;`-delimited.

const INSTITUTIONS: [(&str, &str); 12] = [
    ("Universidade Federal do Parana", "UFPR"),
    ("Universidade Estadual de Campinas", "UNICAMP"),
    ("Universidade Federal de Minas Gerais", "UFMG"),
    ("Universidade de Sao Paulo", "USP"),
    ("Universidade Federal da Bahia", "UFBA"),
    ("Universidade Federal do Ceara", "UFC"),
    ("Centro Universitario Alfa", "ALFA"),
    ("Faculdade Beta de Ciencias da Saude", "BETA"),
    ("Instituto Superior Gama", "GAMA"),
    ("Universidade Federal de Pelotas", "UFPEL"),
    ("Universidade Estadual de Londrina", "UEL"),
    ("Faculdade Delta do Litoral", "DELTA"),
];

const CAMPUSES: [&str; 3] = ["Sede", "Campus Norte", "Campus Litoral"];
const COURSES: [&str; 2] = ["Terapia Ocupacional", "Fisioterapia"];
const MODALITIES: [&str; 2] = ["Presencial", "EAD"];
const STATUSES: [&str; 3] = ["Em atividade", "Em extincao", "Extinta"];

fn main() {
    let output_path = "sample_registry.csv";
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_path(output_path)
        .expect("Failed to create output file");

    writer
        .write_record([
            "Codigo",
            "Instituicao",
            "Sigla",
            "Campus",
            "Curso",
            "Modalidade",
            "Situacao",
            "Vagas",
            "NotaMEC",
            "InicioFuncionamento",
        ])
        .expect("Failed to write header");

    let mut code = 100_000;
    let mut rows = 0usize;
    for (i, (institution, acronym)) in INSTITUTIONS.iter().enumerate() {
        for (j, campus) in CAMPUSES.iter().enumerate() {
            for (k, course) in COURSES.iter().enumerate() {
                code += 7;
                let seed = i * 31 + j * 11 + k * 5;

                let modality = MODALITIES[seed % MODALITIES.len()];
                let status = STATUSES[(seed / 3) % STATUSES.len()];
                let vacancies = 30 + (seed * 17) % 90;
                // Scores between 2.0 and 5.0 in 0.1 steps.
                let score = 2.0 + ((seed * 13) % 31) as f64 / 10.0;
                let year = 1995 + (seed * 7) % 28;
                let month = 1 + (seed * 5) % 12;
                let day = 1 + (seed * 3) % 28;

                writer
                    .write_record([
                        code.to_string(),
                        institution.to_string(),
                        acronym.to_string(),
                        campus.to_string(),
                        course.to_string(),
                        modality.to_string(),
                        status.to_string(),
                        vacancies.to_string(),
                        format!("{score:.1}"),
                        format!("{day:02}/{month:02}/{year}"),
                    ])
                    .expect("Failed to write row");
                rows += 1;
            }
        }
    }

    writer.flush().expect("Failed to flush output file");
    println!("Wrote {rows} registry rows to {output_path}");
}
