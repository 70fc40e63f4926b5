mod test_targeted_send;
