//! Generated preamble: document class, packages, geometry and the choice
//! marker macros.

use std::path::Path;

use tracing::debug;

use texquiz_shared::StyleConfig;

/// Packages loaded before the geometry directive.
const BASE_PACKAGES: &str = r"\documentclass[12pt]{article}
\usepackage[english, catalan]{babel}
\usepackage[utf8]{inputenc}
\usepackage{amsmath, amssymb, amsthm}
\usepackage{color}
\usepackage{graphicx}
";

/// Packages loaded after the geometry directive.
const LAYOUT_PACKAGES: &str = r"\usepackage{adjustbox}
\setlength{\parindent}{0mm}
\usepackage{paralist}
\usepackage{tabto}
\usepackage{intcalc}
\usepackage{enumerate, letltxmacro}
";

/// `\Myitem` draws one of the four icons `art/image0` … `art/image3`, picked
/// by the item counter modulo 4. `tabbedenum{n}` lays the items out inline on
/// `n` tab stops.
const CHOICE_MACROS: &str = r"\newcommand*{\Myitem}{ %
\item[{\adjustbox{valign = c}{\includegraphics[width = 1cm]{art/image\intcalcMod{\value{enumi}}{4}}}}]\stepcounter{enumi} %
}
\LetLtxMacro\itemold\Myitem
\renewcommand{\Myitem}{\itemindent1cm\itemold}
\newenvironment{tabbedenum}[1]
{\NumTabs{#1}\inparaenum\let\latexitem\Myitem
\def\Myitem{\def\Myitem{\tab\latexitem}\latexitem}}
{\endinparaenum}
";

const DOCUMENT_BEGIN: &str = r"\begin{document}
\pagestyle{empty}
\noindent
";

/// `\usepackage[paperwidth=…,paperheight=…,left=…,right=…,top=…,bottom=…]{geometry}`
pub fn geometry_directive(style: &StyleConfig) -> String {
    let size = style.page_size();
    let m = &style.margins;
    debug!(width = %size.width, height = %size.height, "paper dimensions");
    format!(
        "\\usepackage[paperwidth={},paperheight={},left={},right={},top={},bottom={}]{{geometry}}\n",
        size.width, size.height, m.left, m.right, m.top, m.bottom
    )
}

/// Build the full generated preamble, ending right after `\begin{document}`.
///
/// `assets_dir` is the directory holding the `art/` icons; it becomes the
/// graphics search path.
pub fn build_preamble(style: &StyleConfig, assets_dir: &Path) -> String {
    let mut out = String::with_capacity(1536);
    out.push_str(BASE_PACKAGES);
    out.push_str(&geometry_directive(style));
    out.push_str(LAYOUT_PACKAGES);
    for package in &style.extra_packages {
        out.push_str(&format!("\\usepackage{{{package}}}\n"));
    }
    out.push_str(&format!("\\graphicspath{{{{{}/}}}}\n", graphics_path(assets_dir)));
    out.push_str(CHOICE_MACROS);
    out.push_str(DOCUMENT_BEGIN);
    out
}

/// The typesetting engine wants forward slashes and no trailing separator.
fn graphics_path(dir: &Path) -> String {
    let s = dir.to_string_lossy().replace('\\', "/");
    s.trim_end_matches('/').to_string()
}
