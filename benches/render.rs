use molpic::depict::{
    draw::{DrawFlags, SvgDrawer},
    Mol,
};

fn main() {
    divan::main();
}

const TAXOL: &str = "CC1=C2[C@@]([C@]([C@H]([C@@H]3[C@]4([C@H](OC4)C[C@@H]\
([C@]3(C(=O)[C@@H]2OC(=O)C)C)O)OC(=O)C)OC(=O)c5ccccc5)(C[C@@H]1OC(=O)\
[C@H](O)[C@@H](NC(=O)c6ccccc6)c7ccccc7)O)(C)C";

const INPUTS: [&str; 3] = ["CCO", "CN1C=NC2=C1C(=O)N(C(=O)N2C)C", TAXOL];

#[divan::bench(args = INPUTS)]
fn parse(smiles: &str) -> Mol {
    Mol::from_smiles(smiles).unwrap()
}

#[divan::bench(args = INPUTS)]
fn layout(bencher: divan::Bencher, smiles: &str) {
    let mol = Mol::from_smiles(smiles).unwrap();
    bencher.bench_local(|| {
        let mut mol = mol.clone();
        mol.compute_2d_coords();
        mol
    });
}

#[divan::bench(args = INPUTS)]
fn svg(bencher: divan::Bencher, smiles: &str) {
    let mut mol = Mol::from_smiles(smiles).unwrap();
    mol.compute_2d_coords();
    bencher.bench_local(|| {
        let mut drawer = SvgDrawer::new(900, 700);
        drawer.options_mut().flags = DrawFlags::ADD_STEREO_ANNOTATION;
        drawer.draw_molecule(&mol, smiles);
        drawer.finish_drawing();
        drawer.drawing_text()
    });
}
