mod sym;
