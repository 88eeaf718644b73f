mod graph_module;
