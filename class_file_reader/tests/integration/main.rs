mod test_read_class;
