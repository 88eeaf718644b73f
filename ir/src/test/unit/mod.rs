mod format;
mod graph;
mod rewriter;
